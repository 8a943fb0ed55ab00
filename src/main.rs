// Entrypoint for the CLI application.
// - Keeps `main` small: set up logging, load settings, build the API
//   client and hand both to the UI loop.

use odm_frontend::{api::ApiClient, settings::ServerSettings, ui::main_menu};

fn main() -> anyhow::Result<()> {
    // `RUST_LOG=debug` shows every request sent to the server.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let settings = ServerSettings::load();
    let api = ApiClient::from_settings(&settings)?;
    log::info!("using NodeODM at {}", api.base_url());

    // Blocks until the user exits.
    main_menu(api, settings)?;
    Ok(())
}

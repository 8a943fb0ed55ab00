// UI layer: interactive terminal menus built on `dialoguer`.
// All state for one run lives in `Workspace`; the menu functions borrow it
// and hand work to the API client or the GCP session.

use crate::api::{ApiClient, TaskInfo, TaskStatus};
use crate::gcp::{
    check_field, CrsDeclaration, GcpSession, GroundControlPoint, ParseOptions, RowErrorPolicy, ValidateOptions,
};
use crate::presets::{CameraLens, FeatureQuality, Preset, ProcessingOptions, Quality};
use crate::project::Project;
use crate::settings::ServerSettings;
use anyhow::{Context, Result};
use crossterm::style::Stylize;
use dialoguer::{Confirm, Input, Password, Select};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_secs(3);
const MAX_POLL_FAILURES: u32 = 5;
const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "tif", "tiff"];

/// Everything the user has set up during this run.
pub struct Workspace {
    pub settings: ServerSettings,
    pub images: Vec<PathBuf>,
    pub preset: Preset,
    pub options: ProcessingOptions,
    pub gcp: Option<GcpSession>,
    pub current_task: Option<String>,
    pub project_name: String,
}

impl Workspace {
    pub fn new(settings: ServerSettings) -> Self {
        Workspace {
            settings,
            images: Vec::new(),
            preset: Preset::Default,
            options: ProcessingOptions::default(),
            gcp: None,
            current_task: None,
            project_name: "Untitled Project".into(),
        }
    }

    /// File names of the selected images, as GCP rows reference them.
    pub fn image_names(&self) -> HashSet<String> {
        self.images
            .iter()
            .filter_map(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .collect()
    }

    fn to_project(&self) -> Project {
        Project {
            name: self.project_name.clone(),
            preset: self.preset,
            images: self.images.clone(),
            options: self.options.clone(),
            odm_settings: self.settings.clone(),
        }
    }
}

fn ok(msg: impl std::fmt::Display) {
    println!("{} {}", "✓".green(), msg);
}

fn fail(msg: impl std::fmt::Display) {
    println!("{} {}", "✗".red(), msg);
}

fn warn_line(msg: impl std::fmt::Display) {
    println!("{} {}", "⚠".yellow(), msg);
}

fn spinner(msg: &str) -> Result<ProgressBar> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner} {msg}")?);
    spinner.set_message(msg.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    Ok(spinner)
}

/// Main interactive menu. Runs until the user chooses "Exit".
pub fn main_menu(mut api: ApiClient, settings: ServerSettings) -> Result<()> {
    let mut ws = Workspace::new(settings);
    loop {
        let task = ws.current_task.as_deref().unwrap_or("none");
        println!(
            "\n{} | {} images | preset {} | task {}",
            api.base_url().bold(),
            ws.images.len(),
            ws.preset,
            task
        );
        let items = [
            "Server settings",
            "Images",
            "Processing preset & options",
            "Ground control points",
            "Create task",
            "Tasks",
            "Monitor current task",
            "Cancel current task",
            "Remove current task",
            "Download results",
            "Save project",
            "Open project",
            "Exit",
        ];
        let selection = Select::new().items(&items).default(0).interact()?;
        // Failures inside a flow are reported and the menu keeps running.
        let outcome = match selection {
            0 => handle_settings(&mut api, &mut ws),
            1 => handle_images(&mut ws),
            2 => handle_preset(&mut ws),
            3 => gcp_menu(&mut ws),
            4 => handle_create_task(&api, &mut ws),
            5 => handle_tasks(&api, &mut ws),
            6 => handle_monitor(&api, &ws),
            7 => handle_cancel(&api, &ws),
            8 => handle_remove(&api, &mut ws),
            9 => handle_download(&api, &ws),
            10 => handle_save_project(&ws),
            11 => handle_open_project(&mut api, &mut ws),
            _ => break,
        };
        if let Err(err) = outcome {
            fail(format!("{err:#}"));
        }
    }
    if ws.gcp.as_ref().is_some_and(GcpSession::is_dirty) {
        warn_line("GCP edits were not saved.");
    }
    Ok(())
}

fn handle_settings(api: &mut ApiClient, ws: &mut Workspace) -> Result<()> {
    let url: String = Input::new()
        .with_prompt("NodeODM URL")
        .default(ws.settings.base_url.clone())
        .interact_text()?;
    let token = Password::new()
        .with_prompt("Token (empty for none)")
        .allow_empty_password(true)
        .interact()?;
    let settings = ServerSettings::new(&url, &token)?;
    *api = ApiClient::from_settings(&settings)?;
    if let Err(err) = settings.save() {
        warn_line(format!("settings not saved: {err:#}"));
    }
    ws.settings = settings;

    let spinner = spinner("Testing connection...")?;
    let reachable = api.test_connection();
    spinner.finish_and_clear();
    if reachable {
        ok(format!("Connected to ODM server at {}", api.base_url()));
    } else {
        fail(format!(
            "Could not reach {}. Check the URL, that NodeODM is running and that no firewall blocks it.",
            api.base_url()
        ));
    }
    Ok(())
}

fn handle_images(ws: &mut Workspace) -> Result<()> {
    let items = ["Pick with file dialog", "Add by path", "List", "Clear", "Back"];
    match Select::new().items(&items).default(0).interact()? {
        0 => {
            let picked = rfd::FileDialog::new()
                .add_filter("Images", &IMAGE_EXTENSIONS)
                .pick_files()
                .unwrap_or_default();
            let count = picked.len();
            ws.images.extend(picked);
            ok(format!("Added {count} images"));
        }
        1 => {
            let path: String = Input::new().with_prompt("Image file path").interact_text()?;
            let path = PathBuf::from(path.trim());
            if !path.is_file() {
                fail(format!("{} does not exist", path.display()));
            } else {
                ws.images.push(path);
            }
        }
        2 => {
            for path in &ws.images {
                println!("  {}", path.display());
            }
        }
        3 => ws.images.clear(),
        _ => {}
    }
    Ok(())
}

fn handle_preset(ws: &mut Workspace) -> Result<()> {
    let names: Vec<&str> = Preset::ALL.iter().map(|p| p.name()).collect();
    let current = Preset::ALL.iter().position(|p| *p == ws.preset).unwrap_or(0);
    let preset = Preset::ALL[Select::new()
        .with_prompt("Processing preset")
        .items(&names)
        .default(current)
        .interact()?];
    ws.preset = preset;
    preset.apply(&mut ws.options);
    if preset == Preset::Custom {
        edit_options(&mut ws.options)?;
    }
    ok(format!("Applied {preset} preset configuration"));
    Ok(())
}

fn pick<T: Copy + PartialEq>(prompt: &str, values: &[T], labels: &[&str], current: T) -> Result<T> {
    let default = values.iter().position(|v| *v == current).unwrap_or(0);
    let index = Select::new()
        .with_prompt(prompt)
        .items(labels)
        .default(default)
        .interact()?;
    Ok(values[index])
}

fn ask_u32(prompt: &str, current: u32) -> Result<u32> {
    Ok(Input::new().with_prompt(prompt).default(current).interact_text()?)
}

fn ask_bool(prompt: &str, current: bool) -> Result<bool> {
    Ok(Confirm::new().with_prompt(prompt).default(current).interact()?)
}

/// Walk through every processing option.
fn edit_options(o: &mut ProcessingOptions) -> Result<()> {
    let quality_labels: Vec<&str> = Quality::ALL.iter().map(|q| q.as_str()).collect();
    o.feature_extraction = pick(
        "Feature extraction",
        &FeatureQuality::ALL,
        &["auto", "high", "medium", "low"],
        o.feature_extraction,
    )?;
    let lens_labels: Vec<&str> = CameraLens::ALL.iter().map(|l| l.as_str()).collect();
    o.camera_lens = pick("Camera lens", &CameraLens::ALL, &lens_labels, o.camera_lens)?;
    o.dsm = ask_bool("Generate DSM", o.dsm)?;
    o.dtm = ask_bool("Generate DTM", o.dtm)?;
    o.orthophoto = ask_bool("Generate orthophoto", o.orthophoto)?;
    o.reconstruction = pick("Reconstruction quality", &Quality::ALL, &quality_labels, o.reconstruction)?;
    o.fov = ask_u32("Camera field of view (degrees)", o.fov)?;
    o.pointcloud_density = pick("Point cloud density", &Quality::ALL, &quality_labels, o.pointcloud_density)?;
    o.outlier_removal = ask_bool("Remove outliers", o.outlier_removal)?;
    if o.outlier_removal {
        o.deviation = ask_u32("Filter standard deviation", o.deviation)?;
    }
    o.resolution = ask_u32("Orthophoto resolution (cm/px)", o.resolution)?;
    o.tile_size = pick("Mesh size", &[2048, 4096, 8192], &["2048", "4096", "8192"], o.tile_size)?;
    o.texture_mesh = ask_bool("Generate textured mesh", o.texture_mesh)?;
    o.generate_report = ask_bool("Generate processing report", o.generate_report)?;
    o.threads = ask_u32("Threads (0 = auto)", o.threads)?;
    o.memory_limit = ask_u32("Memory limit in GB (0 = none)", o.memory_limit)?;
    Ok(())
}

fn gcp_menu(ws: &mut Workspace) -> Result<()> {
    loop {
        let header = match &ws.gcp {
            Some(s) => format!(
                "{} points in {}{}",
                s.len(),
                s.crs(),
                if s.is_dirty() { " (unsaved)" } else { "" }
            ),
            None => "no GCP file loaded".to_string(),
        };
        println!("\n{}", header.bold());
        let items = ["Load file", "New", "List", "Add point", "Edit point", "Remove point", "Validate", "Save", "Back"];
        match Select::new().items(&items).default(0).interact()? {
            0 => load_gcp(ws)?,
            1 => {
                let crs = ask_crs(CrsDeclaration::wgs84())?;
                ws.gcp = Some(GcpSession::new(crs));
            }
            2 => {
                if let Some(session) = &ws.gcp {
                    (0..session.len())
                        .filter_map(|i| session.summary(i))
                        .for_each(|line| println!("  {line}"));
                }
            }
            3 => {
                let names = ws.image_names();
                let session = ws.gcp.get_or_insert_with(|| GcpSession::new(CrsDeclaration::wgs84()));
                let point = ask_point(None, &names)?;
                match session.add_point(point) {
                    Ok(index) => ok(format!("GCP point {} added", index + 1)),
                    Err(err) => fail(err),
                }
            }
            4 => {
                let names = ws.image_names();
                if let Some(session) = ws.gcp.as_mut() {
                    if let Some(index) = choose_point(session)? {
                        let point = ask_point(session.point(index), &names)?;
                        match session.update_point(index, point) {
                            Ok(()) => ok(format!("GCP point {} updated", index + 1)),
                            Err(err) => fail(err),
                        }
                    }
                }
            }
            5 => {
                if let Some(session) = ws.gcp.as_mut() {
                    if let Some(index) = choose_point(session)? {
                        let sure = Confirm::new()
                            .with_prompt(format!("Delete GCP point {}?", index + 1))
                            .default(false)
                            .interact()?;
                        if sure {
                            session.remove_point(index)?;
                            ok("GCP point deleted");
                        }
                    }
                }
            }
            6 => validate_gcp(ws)?,
            7 => save_gcp(ws)?,
            _ => return Ok(()),
        }
    }
}

fn load_gcp(ws: &mut Workspace) -> Result<()> {
    let path: String = Input::new()
        .with_prompt("GCP file path")
        .default("gcp_list.txt".into())
        .interact_text()?;
    let options = ParseOptions {
        on_row_error: RowErrorPolicy::Skip,
        ..ParseOptions::default()
    };
    let (session, rejected) = GcpSession::load(Path::new(path.trim()), &options)?;
    for err in &rejected {
        warn_line(err);
    }
    ok(format!("Loaded {} GCP points (Projection: {})", session.len(), session.crs()));
    ws.gcp = Some(session);
    Ok(())
}

fn save_gcp(ws: &mut Workspace) -> Result<()> {
    let Some(session) = ws.gcp.as_mut() else {
        fail("No GCP points to save.");
        return Ok(());
    };
    let default = session
        .path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "gcp_list.txt".into());
    let path: String = Input::new()
        .with_prompt("Save GCP file as")
        .default(default)
        .interact_text()?;
    session.save(Path::new(path.trim()))?;
    ok(format!("Saved {} GCP points to {}", session.len(), path.trim()));
    Ok(())
}

fn validate_gcp(ws: &Workspace) -> Result<()> {
    let Some(session) = &ws.gcp else {
        fail("No GCP points loaded.");
        return Ok(());
    };
    let issues = session.validate(&ws.image_names(), &ValidateOptions::default())?;
    if issues.is_empty() {
        ok("GCP points look good");
    }
    for issue in &issues {
        warn_line(issue);
    }
    Ok(())
}

fn ask_crs(current: CrsDeclaration) -> Result<CrsDeclaration> {
    loop {
        let line: String = Input::new()
            .with_prompt("Coordinate system (EPSG:<code> or +proj=...)")
            .default(current.to_string())
            .interact_text()?;
        match CrsDeclaration::recognize(&line) {
            Some(crs) => return Ok(crs),
            None => fail(format!("`{}` is not an EPSG code or PROJ string", line.trim())),
        }
    }
}

fn choose_point(session: &GcpSession) -> Result<Option<usize>> {
    if session.is_empty() {
        fail("No GCP points.");
        return Ok(None);
    }
    let items: Vec<String> = (0..session.len()).filter_map(|i| session.summary(i)).collect();
    Ok(Select::new().items(&items).default(0).interact_opt()?)
}

/// Prompt for a point, pre-filled from `current` when editing.
fn ask_point(current: Option<&GroundControlPoint>, images: &HashSet<String>) -> Result<GroundControlPoint> {
    let geo_x: f64 = Input::new()
        .with_prompt("World X")
        .default(current.map_or(0.0, |p| p.geo_x))
        .interact_text()?;
    let geo_y: f64 = Input::new()
        .with_prompt("World Y")
        .default(current.map_or(0.0, |p| p.geo_y))
        .interact_text()?;
    let geo_z: f64 = Input::new()
        .with_prompt("World Z")
        .default(current.and_then(|p| p.geo_z).unwrap_or(0.0))
        .interact_text()?;
    let im_x: i64 = Input::new()
        .with_prompt("Image X (px)")
        .default(current.map_or(0, |p| p.im_x))
        .interact_text()?;
    let im_y: i64 = Input::new()
        .with_prompt("Image Y (px)")
        .default(current.map_or(0, |p| p.im_y))
        .interact_text()?;

    let (mut names, spaced): (Vec<&String>, Vec<&String>) = images
        .iter()
        .partition(|name| check_field("image name", name).is_ok());
    if !spaced.is_empty() {
        warn_line(format!(
            "{} image name(s) contain spaces and cannot be referenced from a GCP file",
            spaced.len()
        ));
    }
    names.sort();
    let image_name = if names.is_empty() {
        let mut input = Input::<String>::new();
        input
            .with_prompt("Image file")
            .validate_with(|value: &String| check_field("image name", value.trim()));
        if let Some(p) = current {
            input.default(p.image_name.clone());
        }
        input.interact_text()?.trim().to_string()
    } else {
        let default = current
            .and_then(|p| names.iter().position(|n| **n == p.image_name))
            .unwrap_or(0);
        names[Select::new()
            .with_prompt("Image file")
            .items(&names)
            .default(default)
            .interact()?]
        .clone()
    };

    let label: String = Input::new()
        .with_prompt("GCP name (optional)")
        .default(current.and_then(|p| p.gcp_name.clone()).unwrap_or_default())
        .allow_empty(true)
        .validate_with(|value: &String| match value.trim() {
            "" => Ok(()),
            name => check_field("GCP name", name),
        })
        .interact_text()?;

    let mut point = GroundControlPoint::new(geo_x, geo_y, Some(geo_z), im_x, im_y, image_name);
    if !label.trim().is_empty() {
        point = point.with_name(label.trim());
    }
    if let Some(p) = current {
        point = point.with_extras(p.extras.iter().cloned());
    }
    Ok(point)
}

fn handle_create_task(api: &ApiClient, ws: &mut Workspace) -> Result<()> {
    if ws.images.is_empty() {
        fail("Please add images first.");
        return Ok(());
    }
    let gcp_file = match &ws.gcp {
        Some(session) if session.is_dirty() || session.path().is_none() => {
            fail("Save the GCP file before creating a task.");
            return Ok(());
        }
        Some(session) => session.path().map(Path::to_path_buf),
        None => None,
    };
    let name: String = Input::new().with_prompt("Task name").interact_text()?;

    let spinner = spinner(&format!(
        "Creating task \"{}\" with {} images...",
        name,
        ws.images.len()
    ))?;
    let created = api.create_task(
        &ws.images,
        gcp_file.as_deref(),
        &ws.options.to_task_options(),
        Some(name.as_str()),
    );
    spinner.finish_and_clear();
    match created {
        Ok(uuid) => {
            ok(format!("Task \"{name}\" created. Task ID: {uuid}"));
            ws.current_task = Some(uuid);
        }
        Err(err) => fail(format!(
            "Failed to create task: {err:#}\nCheck that NodeODM is running, the images are valid drone photos and the server has enough resources."
        )),
    }
    Ok(())
}

fn handle_tasks(api: &ApiClient, ws: &mut Workspace) -> Result<()> {
    let spinner = spinner("Loading tasks...")?;
    let tasks = api.tasks();
    spinner.finish_and_clear();
    let tasks = tasks?;
    if tasks.is_empty() {
        println!("No tasks on {}", api.base_url());
        return Ok(());
    }
    let items: Vec<String> = tasks
        .iter()
        .map(|t| format!("{} (ID: {}) - {}", t.name, t.uuid, t.status))
        .collect();
    if let Some(index) = Select::new()
        .with_prompt("Select a task (Esc to go back)")
        .items(&items)
        .default(0)
        .interact_opt()?
    {
        ws.current_task = Some(tasks[index].uuid.clone());
    }
    Ok(())
}

fn current_task(ws: &Workspace) -> Option<&str> {
    let task = ws.current_task.as_deref();
    if task.is_none() {
        fail("No task selected.");
    }
    task
}

/// Poll the current task until it reaches a terminal state.
fn handle_monitor(api: &ApiClient, ws: &Workspace) -> Result<()> {
    let Some(uuid) = current_task(ws) else {
        return Ok(());
    };
    let bar = ProgressBar::new(100);
    bar.set_style(ProgressStyle::with_template("[{bar:40}] {pos:>3}% {msg}")?);
    let polled = poll_until_terminal(
        || api.task_info(uuid),
        |info| {
            bar.set_position(info.progress.clamp(0.0, 100.0) as u64);
            bar.set_message(info.status_line());
        },
        |err| bar.suspend(|| warn_line(format!("status check failed, retrying: {err:#}"))),
        POLL_INTERVAL,
    );
    let info = match polled {
        Ok(info) => info,
        Err(err) => {
            bar.abandon();
            return Err(err.context(format!("lost contact with task {uuid}")));
        }
    };
    bar.finish_and_clear();
    println!("{}", info.status_line());
    match info.status {
        TaskStatus::Completed => ok("Processing completed successfully!"),
        TaskStatus::Failed => fail("Processing failed!"),
        _ => warn_line("Processing was canceled."),
    }
    Ok(())
}

/// Fetch task info every `interval` until the task reaches a terminal state.
/// A failed fetch is passed to `on_error` and retried; `MAX_POLL_FAILURES`
/// failures in a row end the wait with the last error.
fn poll_until_terminal(
    mut fetch: impl FnMut() -> Result<TaskInfo>,
    mut on_update: impl FnMut(&TaskInfo),
    mut on_error: impl FnMut(&anyhow::Error),
    interval: Duration,
) -> Result<TaskInfo> {
    let mut failures = 0;
    loop {
        match fetch() {
            Ok(info) => {
                failures = 0;
                on_update(&info);
                if info.status.is_terminal() {
                    return Ok(info);
                }
            }
            Err(err) => {
                failures += 1;
                if failures >= MAX_POLL_FAILURES {
                    return Err(err);
                }
                on_error(&err);
            }
        }
        thread::sleep(interval);
    }
}

fn handle_cancel(api: &ApiClient, ws: &Workspace) -> Result<()> {
    let Some(uuid) = current_task(ws) else {
        return Ok(());
    };
    let sure = Confirm::new()
        .with_prompt(format!("Stop task {uuid}? This cannot be undone."))
        .default(false)
        .interact()?;
    if sure {
        if api.cancel_task(uuid)? {
            ok(format!("Task {uuid} stopped"));
        } else {
            fail(format!("Failed to stop task {uuid}"));
        }
    }
    Ok(())
}

fn handle_remove(api: &ApiClient, ws: &mut Workspace) -> Result<()> {
    let Some(uuid) = current_task(ws).map(str::to_string) else {
        return Ok(());
    };
    let sure = Confirm::new()
        .with_prompt(format!("Delete task {uuid} and all its data?"))
        .default(false)
        .interact()?;
    if sure {
        if api.remove_task(&uuid)? {
            ok(format!("Task {uuid} deleted"));
            ws.current_task = None;
        } else {
            fail(format!("Failed to delete task {uuid}"));
        }
    }
    Ok(())
}

fn handle_download(api: &ApiClient, ws: &Workspace) -> Result<()> {
    let Some(uuid) = current_task(ws) else {
        return Ok(());
    };
    let info = api.task_info(uuid)?;
    if info.status != TaskStatus::Completed {
        fail("Task must be completed before downloading results.");
        return Ok(());
    }
    let path: String = Input::new()
        .with_prompt("Save results as")
        .default(format!("{uuid}.zip"))
        .interact_text()?;
    let spinner = spinner(&format!("Downloading results to {}...", path.trim()))?;
    let written = api.download_all(uuid, Path::new(path.trim()));
    spinner.finish_and_clear();
    ok(format!("Download completed ({} bytes)", written?));
    Ok(())
}

fn handle_save_project(ws: &Workspace) -> Result<()> {
    if ws.images.is_empty() {
        fail("No images to save. Add images first.");
        return Ok(());
    }
    let path: String = Input::new()
        .with_prompt("Project file")
        .default("project.odm".into())
        .interact_text()?;
    ws.to_project().save(Path::new(path.trim()))?;
    ok(format!("Project saved to {}", path.trim()));
    Ok(())
}

fn handle_open_project(api: &mut ApiClient, ws: &mut Workspace) -> Result<()> {
    let path: String = Input::new().with_prompt("Project file").interact_text()?;
    let project = Project::load(Path::new(path.trim()))?;
    for missing in project.missing_images() {
        warn_line(format!("Image not found: {}", missing.display()));
    }
    *api = ApiClient::from_settings(&project.odm_settings)
        .context("Project has unusable server settings")?;
    ws.settings = project.odm_settings;
    ws.images = project.images;
    ws.preset = project.preset;
    ws.options = project.options;
    ws.project_name = project.name;
    ok(format!("Project \"{}\" loaded", ws.project_name));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_names_use_file_names_only() {
        let mut ws = Workspace::new(ServerSettings::default());
        ws.images = vec![
            PathBuf::from("/data/flight1/IMG_0525.jpg"),
            PathBuf::from("relative/IMG_0526.JPG"),
        ];
        let names = ws.image_names();
        assert!(names.contains("IMG_0525.jpg"));
        assert!(names.contains("IMG_0526.JPG"));
        assert_eq!(names.len(), 2);
    }

    #[test]
    fn project_snapshot_carries_workspace_state() {
        let mut ws = Workspace::new(ServerSettings::default());
        ws.preset = Preset::Field;
        Preset::Field.apply(&mut ws.options);
        ws.images.push(PathBuf::from("a.jpg"));
        let project = ws.to_project();
        assert_eq!(project.preset, Preset::Field);
        assert_eq!(project.images, ws.images);
        assert_eq!(project.name, "Untitled Project");
        assert_eq!(Some(project.options), Preset::Field.options());
    }

    fn task(code: i64, progress: f64) -> TaskInfo {
        serde_json::from_value(serde_json::json!({
            "uuid": "t-1",
            "status": { "code": code },
            "progress": progress,
        }))
        .unwrap()
    }

    #[test]
    fn polling_survives_transient_errors() {
        let mut responses = vec![
            Err(anyhow::anyhow!("connection reset")),
            Ok(task(20, 40.0)),
            Err(anyhow::anyhow!("timed out")),
            Ok(task(40, 100.0)),
        ]
        .into_iter();
        let mut progress = Vec::new();
        let mut errors = 0;
        let info = poll_until_terminal(
            || responses.next().unwrap(),
            |info| progress.push(info.progress),
            |_| errors += 1,
            Duration::ZERO,
        )
        .unwrap();
        assert_eq!(info.status, TaskStatus::Completed);
        assert_eq!(progress, vec![40.0, 100.0]);
        assert_eq!(errors, 2);
    }

    #[test]
    fn polling_gives_up_after_repeated_failures() {
        let mut calls = 0;
        let mut errors = 0;
        let result = poll_until_terminal(
            || {
                calls += 1;
                Err(anyhow::anyhow!("server down"))
            },
            |_| {},
            |_| errors += 1,
            Duration::ZERO,
        );
        assert!(result.is_err());
        assert_eq!(calls, MAX_POLL_FAILURES);
        assert_eq!(errors, MAX_POLL_FAILURES - 1);
    }
}

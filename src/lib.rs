// Library root
// -----------
// This crate exposes the library surface behind the `odm-frontend` CLI.
// The binary (`main.rs`) wires these modules into the interactive menus.
//
// Module responsibilities:
// - `gcp`: ground control point files (parse, serialize, validate, edit).
//   Pure, synchronous and free of I/O except for session load/save.
// - `presets`: processing presets and their NodeODM task options.
// - `settings` / `project`: what gets persisted between runs.
// - `api`: HTTP interactions with a NodeODM server.
// - `ui`: terminal flows that tie the above together.
pub mod api;
pub mod gcp;
pub mod presets;
pub mod project;
pub mod settings;
pub mod ui;

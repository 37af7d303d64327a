//! Native file pickers and message boxes

use std::path::{Path, PathBuf};

use rfd::{FileDialog, MessageButtons, MessageDialog, MessageLevel};

pub const CONFIG_NOT_FOUND: &str = "config file not found";
pub const SET_CONFIG_PATH: &str = "set path to config file";
pub const CHECKPOINT_ERROR: &str = "checkpoint loading error";

fn start_dir(hint: &Path) -> PathBuf {
    match hint.parent() {
        Some(parent) if parent.is_dir() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Ask for the NEAT config file, starting next to the current one
pub fn pick_config(current: &Path) -> Option<PathBuf> {
    FileDialog::new()
        .set_title(SET_CONFIG_PATH)
        .set_directory(start_dir(current))
        .add_filter("NEAT config", &["txt", "ini", "cfg"])
        .add_filter("All files", &["*"])
        .pick_file()
}

/// Ask for a checkpoint file inside `root`
pub fn pick_checkpoint(root: &Path) -> Option<PathBuf> {
    FileDialog::new()
        .set_title("load generation checkpoint")
        .set_directory(root)
        .pick_file()
}

pub fn show_error(title: &str, description: &str) {
    log::error!("{title}: {description}");
    MessageDialog::new()
        .set_level(MessageLevel::Error)
        .set_title(title)
        .set_description(description)
        .set_buttons(MessageButtons::Ok)
        .show();
}

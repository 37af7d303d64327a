//! Launcher window
//!
//! Software-rendered through `pixels`: the arena is drawn pixel by pixel into
//! a framebuffer the size of the world, text uses a built-in 5x7 font.

pub mod dialogs;
pub mod draw;
pub mod menu;
pub mod viewer;

pub use menu::{Menu, MenuAction, SettingsEditor};
pub use viewer::{Viewer, ViewerError, WindowRunner};

//! Launcher menu and the NEAT settings editor
//!
//! Both are plain state plus a `draw` method; the viewer owns the window and
//! routes input to them.

use std::path::{Path, PathBuf};

use crate::neat::params::{self, ParamSpec, SECTIONS};
use crate::neat::{Config, ConfigError};
use crate::settings::Settings;

use super::draw::{Canvas, DIM_TEXT, ERROR, HIGHLIGHT, ScreenRect, TEXT, text_height};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    StartTraining,
    LoadGeneration,
    ConfigureSettings,
    Play,
    Quit,
}

impl MenuAction {
    pub const ALL: [MenuAction; 5] = [
        MenuAction::StartTraining,
        MenuAction::LoadGeneration,
        MenuAction::ConfigureSettings,
        MenuAction::Play,
        MenuAction::Quit,
    ];

    pub fn label(self) -> &'static str {
        match self {
            MenuAction::StartTraining => "START TRAINING",
            MenuAction::LoadGeneration => "LOAD GENERATION",
            MenuAction::ConfigureSettings => "CONFIGURE SETTINGS",
            MenuAction::Play => "PLAY",
            MenuAction::Quit => "QUIT",
        }
    }
}

const BUTTON_WIDTH: i32 = 420;
const BUTTON_HEIGHT: i32 = 56;
const BUTTON_GAP: i32 = 20;
const FIRST_BUTTON_Y: i32 = 240;

/// Main launcher screen
#[derive(Debug, Clone)]
pub struct Menu {
    buttons: Vec<(ScreenRect, MenuAction)>,
    status: Option<(String, bool)>,
}

impl Menu {
    pub fn new(screen_width: u32) -> Self {
        let x = (screen_width as i32 - BUTTON_WIDTH) / 2;
        let buttons = MenuAction::ALL
            .iter()
            .enumerate()
            .map(|(i, &action)| {
                let y = FIRST_BUTTON_Y + i as i32 * (BUTTON_HEIGHT + BUTTON_GAP);
                (ScreenRect::new(x, y, BUTTON_WIDTH, BUTTON_HEIGHT), action)
            })
            .collect();
        Self {
            buttons,
            status: None,
        }
    }

    pub fn hit(&self, x: f32, y: f32) -> Option<MenuAction> {
        self.buttons
            .iter()
            .find(|(rect, _)| rect.contains(x, y))
            .map(|&(_, action)| action)
    }

    /// Line shown under the buttons, e.g. the result of the last run
    pub fn set_status(&mut self, message: impl Into<String>, is_error: bool) {
        self.status = Some((message.into(), is_error));
    }

    pub fn draw(&self, canvas: &mut Canvas<'_>, mouse: Option<(f32, f32)>, settings: &Settings) {
        canvas.clear([16, 16, 28, 255]);
        let center = canvas.width() as i32 / 2;
        canvas.text_centered("NEAT BREAKOUT", center, 90, 6, HIGHLIGHT);
        let config = format!("CONFIG: {}", settings.neat_config_path.display());
        canvas.text_centered(&config, center, 170, 2, DIM_TEXT);

        let hovered = mouse.and_then(|(x, y)| self.hit(x, y));
        for &(rect, action) in &self.buttons {
            canvas.button(rect, action.label(), hovered == Some(action));
        }

        let mode = if settings.headless { "HEADLESS TRAINING" } else { "WATCHED TRAINING" };
        let footer_y = canvas.height() as i32 - 40;
        canvas.text_centered(mode, center, footer_y, 2, DIM_TEXT);
        if let Some((message, is_error)) = &self.status {
            let color = if *is_error { ERROR } else { TEXT };
            canvas.text_centered(message, center, footer_y - 30, 2, color);
        }
    }
}

/// Section-by-section editor for the NEAT config file
///
/// Values are changed in steps (toggle, +/- or cycle) and validated through
/// [`Config::with_value`], so the file on disk is always loadable.
#[derive(Debug, Clone)]
pub struct SettingsEditor {
    config: Config,
    path: PathBuf,
    section: usize,
    row: usize,
    dirty: bool,
    message: Option<(String, bool)>,
}

impl SettingsEditor {
    pub fn new(config: Config, path: PathBuf) -> Self {
        Self {
            config,
            path,
            section: 0,
            row: 0,
            dirty: false,
            message: None,
        }
    }

    pub fn open(path: &Path) -> Result<Self, ConfigError> {
        Ok(Self::new(Config::load(path)?, path.to_path_buf()))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn section_name(&self) -> &'static str {
        SECTIONS[self.section]
    }

    pub fn rows(&self) -> Vec<&'static ParamSpec> {
        params::section_params(self.section_name()).collect()
    }

    pub fn selected(&self) -> Option<&'static ParamSpec> {
        self.rows().get(self.row).copied()
    }

    /// Current text of a key, or its documented default
    pub fn value_of(&self, spec: &ParamSpec) -> String {
        self.config
            .value(spec.section, spec.name)
            .or(spec.default)
            .unwrap_or("")
            .to_string()
    }

    pub fn move_selection(&mut self, down: bool) {
        let len = self.rows().len();
        if len == 0 {
            return;
        }
        self.row = if down {
            (self.row + 1) % len
        } else {
            (self.row + len - 1) % len
        };
    }

    pub fn switch_section(&mut self, forward: bool) {
        let len = SECTIONS.len();
        self.section = if forward {
            (self.section + 1) % len
        } else {
            (self.section + len - 1) % len
        };
        self.row = 0;
    }

    /// Step the selected value; an invalid result leaves the config unchanged
    pub fn step_selected(&mut self, forward: bool) -> Result<(), ConfigError> {
        let Some(spec) = self.selected() else {
            return Ok(());
        };
        let next = spec.step(&self.value_of(spec), forward);
        match self.config.with_value(spec.section, spec.name, &next) {
            Ok(config) => {
                self.config = config;
                self.dirty = true;
                self.message = None;
                Ok(())
            }
            Err(e) => {
                self.message = Some((e.to_string(), true));
                Err(e)
            }
        }
    }

    pub fn save(&mut self) -> Result<(), ConfigError> {
        self.config.save(&self.path)?;
        self.dirty = false;
        self.message = Some((format!("SAVED {}", self.path.display()), false));
        log::info!("Saved NEAT config to {}", self.path.display());
        Ok(())
    }

    pub fn set_message(&mut self, message: impl Into<String>, is_error: bool) {
        self.message = Some((message.into(), is_error));
    }

    pub fn draw(&self, canvas: &mut Canvas<'_>, settings: &Settings) {
        canvas.clear([16, 16, 28, 255]);
        let center = canvas.width() as i32 / 2;
        let title = format!("[{}]", self.section_name());
        canvas.text_centered(&title, center, 24, 4, HIGHLIGHT);
        let description = params::section_description(self.section_name());
        canvas.text_centered(description, center, 64, 2, DIM_TEXT);

        let scale = 2;
        let line = text_height(scale) + 8;
        let top = 100;
        let visible = ((canvas.height() as i32 - top - 120) / line).max(1) as usize;
        let rows = self.rows();
        let first = self.row.saturating_sub(visible - 1);
        for (i, spec) in rows.iter().enumerate().skip(first).take(visible) {
            let y = top + (i - first) as i32 * line;
            let selected = i == self.row;
            if selected {
                canvas.fill_rect(40, y - 4, canvas.width() as i32 - 80, line, [60, 60, 100, 200]);
            }
            let color = if selected { HIGHLIGHT } else { TEXT };
            canvas.text(spec.name, 50, y, scale, color);
            canvas.text(&self.value_of(spec), 560, y, scale, color);
        }

        let bottom = canvas.height() as i32;
        if let Some(spec) = self.selected() {
            canvas.text(spec.description, 50, bottom - 110, scale, DIM_TEXT);
        }
        if let Some((message, is_error)) = &self.message {
            canvas.text(message, 50, bottom - 80, scale, if *is_error { ERROR } else { TEXT });
        }
        let headless = if settings.headless { "ON" } else { "OFF" };
        let help = format!(
            "UP/DOWN SELECT  LEFT/RIGHT CHANGE  TAB SECTION  S SAVE  \
             H HEADLESS ({headless})  ESC BACK{}",
            if self.dirty { " *" } else { "" }
        );
        canvas.text(&help, 50, bottom - 40, scale, DIM_TEXT);
    }
}

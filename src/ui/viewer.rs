//! Window, event loop and the screens drawn into it
//!
//! One [`Viewer`] owns the winit event loop for the whole process. Each
//! screen (menu, settings editor, episode) re-enters the loop with
//! `run_return` and leaves it when the screen is done, so training can call
//! back into the window between genomes.

use std::path::Path;
use std::time::Instant;

use pixels::{Pixels, SurfaceTexture};
use thiserror::Error;
use winit::dpi::LogicalSize;
use winit::event::VirtualKeyCode;
use winit::event_loop::{ControlFlow, EventLoop};
use winit::platform::run_return::EventLoopExtRunReturn;
use winit::window::{Window, WindowBuilder};
use winit_input_helper::WinitInputHelper;

use crate::agent::{HumanController, ManualInput};
use crate::consts::{ARENA_HEIGHT, ARENA_WIDTH, MAX_SUBSTEPS, SIM_DT};
use crate::episode::{Episode, EpisodeEnd};
use crate::neat::{GenomeKey, NeatError};
use crate::settings::{Settings, step_sim_speed};
use crate::sim::EndReason;
use crate::training::EpisodeRunner;

use super::draw::{Canvas, HIGHLIGHT, TEXT, draw_game, draw_hud};
use super::menu::{Menu, MenuAction, SettingsEditor};

pub const WINDOW_WIDTH: u32 = ARENA_WIDTH as u32;
pub const WINDOW_HEIGHT: u32 = ARENA_HEIGHT as u32;
pub const SCREENSHOT_FILE: &str = "breakout.png";
pub const HUD_HELP: &str = "Press R to reset, ESC or Q to quit";

#[derive(Debug, Error)]
pub enum ViewerError {
    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),
    #[error("failed to create framebuffer: {0}")]
    Pixels(#[from] pixels::Error),
}

/// What a screen wants after drawing a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame {
    Continue,
    Done,
}

/// Whole ticks to simulate for `dt` seconds of wall time at `speed`x
///
/// The remainder stays in `accumulator`. Falling too far behind drops the
/// backlog instead of stalling the window.
pub fn take_ticks(accumulator: &mut f32, dt: f32, speed: u32) -> u32 {
    *accumulator += dt.min(0.1) * speed as f32;
    let ticks = (*accumulator / SIM_DT) as u32;
    let cap = MAX_SUBSTEPS * speed;
    if ticks > cap {
        *accumulator = 0.0;
        return cap;
    }
    *accumulator -= ticks as f32 * SIM_DT;
    ticks
}

pub struct Viewer {
    // the surface goes before the window it draws into
    pixels: Pixels,
    window: Window,
    input: WinitInputHelper,
    closed: bool,
    event_loop: EventLoop<()>,
}

impl Viewer {
    pub fn new(title: &str) -> Result<Self, ViewerError> {
        let event_loop = EventLoop::new();
        let window = WindowBuilder::new()
            .with_title(title)
            .with_inner_size(LogicalSize::new(WINDOW_WIDTH, WINDOW_HEIGHT))
            .with_resizable(false)
            .build(&event_loop)?;
        let pixels = {
            let size = window.inner_size();
            let surface = SurfaceTexture::new(size.width, size.height, &window);
            Pixels::new(WINDOW_WIDTH, WINDOW_HEIGHT, surface)?
        };
        Ok(Self {
            pixels,
            window,
            input: WinitInputHelper::new(),
            closed: false,
            event_loop,
        })
    }

    /// False once the user closed the window
    pub fn is_open(&self) -> bool {
        !self.closed
    }

    pub fn set_title(&self, title: &str) {
        self.window.set_title(title);
    }

    /// Pump events and draw frames until `on_frame` says done or the window
    /// closes. Returns whether the window is still open.
    fn run_frames<F>(&mut self, mut on_frame: F) -> bool
    where
        F: FnMut(&WinitInputHelper, Option<(f32, f32)>, &mut Canvas<'_>) -> Frame,
    {
        if self.closed {
            return false;
        }
        let Self {
            pixels,
            input,
            closed,
            event_loop,
            ..
        } = &mut *self;

        event_loop.run_return(|event, _, control_flow| {
            *control_flow = ControlFlow::Poll;
            if !input.update(&event) {
                return;
            }
            if input.close_requested() || input.destroyed() {
                *closed = true;
                *control_flow = ControlFlow::Exit;
                return;
            }
            if let Some(size) = input.window_resized() {
                if let Err(e) = pixels.resize_surface(size.width, size.height) {
                    log::error!("Failed to resize surface: {e}");
                    *closed = true;
                    *control_flow = ControlFlow::Exit;
                    return;
                }
            }

            let mouse = input
                .mouse()
                .and_then(|pos| pixels.window_pos_to_pixel(pos).ok())
                .map(|(x, y)| (x as f32, y as f32));
            let flow = {
                let mut canvas = Canvas::new(pixels.frame_mut(), WINDOW_WIDTH, WINDOW_HEIGHT);
                on_frame(input, mouse, &mut canvas)
            };
            if let Err(e) = pixels.render() {
                log::error!("Render error: {e}");
                *closed = true;
                *control_flow = ControlFlow::Exit;
                return;
            }
            if flow == Frame::Done {
                *control_flow = ControlFlow::Exit;
            }
        });
        !*closed
    }

    /// Launcher screen; `None` when the window was closed
    pub fn run_menu(&mut self, menu: &Menu, settings: &Settings) -> Option<MenuAction> {
        let mut chosen = None;
        self.run_frames(|input, mouse, canvas| {
            menu.draw(canvas, mouse, settings);
            if input.key_pressed(VirtualKeyCode::Escape) {
                chosen = Some(MenuAction::Quit);
            } else if input.mouse_pressed(0) {
                chosen = mouse.and_then(|(x, y)| menu.hit(x, y));
            } else {
                let shortcuts = [
                    VirtualKeyCode::Key1,
                    VirtualKeyCode::Key2,
                    VirtualKeyCode::Key3,
                    VirtualKeyCode::Key4,
                    VirtualKeyCode::Key5,
                ];
                chosen = shortcuts
                    .iter()
                    .position(|&key| input.key_pressed(key))
                    .map(|i| MenuAction::ALL[i]);
            }
            if chosen.is_some() { Frame::Done } else { Frame::Continue }
        });
        chosen
    }

    /// NEAT config editor; returns whether the window is still open
    pub fn run_editor(&mut self, editor: &mut SettingsEditor, settings: &mut Settings) -> bool {
        self.run_frames(|input, _mouse, canvas| {
            if input.key_pressed(VirtualKeyCode::Escape) {
                if editor.is_dirty() {
                    log::info!("Leaving settings editor without saving");
                }
                return Frame::Done;
            }
            if input.key_pressed(VirtualKeyCode::Up) {
                editor.move_selection(false);
            }
            if input.key_pressed(VirtualKeyCode::Down) {
                editor.move_selection(true);
            }
            if input.key_pressed(VirtualKeyCode::Tab)
                || input.key_pressed(VirtualKeyCode::PageDown)
            {
                editor.switch_section(!input.held_shift());
            }
            if input.key_pressed(VirtualKeyCode::PageUp) {
                editor.switch_section(false);
            }
            for (key, forward) in [(VirtualKeyCode::Right, true), (VirtualKeyCode::Left, false)] {
                if input.key_pressed(key) {
                    if let Err(e) = editor.step_selected(forward) {
                        log::warn!("Rejected value: {e}");
                    }
                }
            }
            if input.key_pressed(VirtualKeyCode::S) {
                if let Err(e) = editor.save() {
                    editor.set_message(e.to_string(), true);
                    log::error!("{e}");
                }
            }
            if input.key_pressed(VirtualKeyCode::H) {
                settings.headless = !settings.headless;
            }
            editor.draw(canvas, settings);
            Frame::Continue
        })
    }

    /// Play `episode` in real time scaled by `speed`
    ///
    /// ESC or Q end the episode with [`EndReason::Quit`]; `None` means the
    /// window was closed.
    pub fn run_episode(
        &mut self,
        episode: &mut Episode,
        speed: &mut u32,
        caption: &[String],
    ) -> Option<EpisodeEnd> {
        let mut result = None;
        let mut accumulator = 0.0;
        let mut last = Instant::now();
        let mut pending_spawn = false;
        let mut pending_reset = false;

        let open = self.run_frames(|input, _mouse, canvas| {
            if input.key_pressed(VirtualKeyCode::Escape) || input.key_pressed(VirtualKeyCode::Q) {
                result = Some(episode.end(EndReason::Quit));
            }
            if input.key_pressed(VirtualKeyCode::Equals)
                || input.key_pressed(VirtualKeyCode::NumpadAdd)
            {
                *speed = step_sim_speed(*speed, true);
            }
            if input.key_pressed(VirtualKeyCode::Minus)
                || input.key_pressed(VirtualKeyCode::NumpadSubtract)
            {
                *speed = step_sim_speed(*speed, false);
            }
            pending_spawn |= input.key_pressed(VirtualKeyCode::Space);
            pending_reset |= input.key_pressed(VirtualKeyCode::R);

            let now = Instant::now();
            let ticks = take_ticks(&mut accumulator, (now - last).as_secs_f32(), *speed);
            last = now;
            for _ in 0..ticks {
                if result.is_some() {
                    break;
                }
                let manual = ManualInput {
                    left: input.key_held(VirtualKeyCode::Left),
                    right: input.key_held(VirtualKeyCode::Right),
                    spawn_ball: pending_spawn,
                    reset_level: pending_reset,
                };
                pending_spawn = false;
                pending_reset = false;
                result = episode.step(&manual);
            }

            draw_game(canvas, episode.state());
            let mut lines = caption.to_vec();
            lines.push(format!("{}  FITNESS {:.3}", episode.label(), episode.fitness()));
            lines.push(format!(
                "BRICKS {}  SPEED X{} (+/-)",
                episode.tracker().bricks(),
                speed
            ));
            lines.push(HUD_HELP.to_string());
            draw_hud(canvas, &lines);

            if input.key_pressed(VirtualKeyCode::P) {
                screenshot(canvas);
            }
            if result.is_some() { Frame::Done } else { Frame::Continue }
        });
        if open { result } else { None }
    }

    /// Final frame of a finished game with a restart prompt.
    /// Returns true for another round.
    fn game_over(&mut self, episode: &Episode, end: &EpisodeEnd) -> bool {
        let mut again = false;
        self.run_frames(|input, _mouse, canvas| {
            draw_game(canvas, episode.state());
            let center = canvas.width() as i32 / 2;
            let middle = canvas.height() as i32 / 2;
            canvas.fill_rect(0, middle - 70, canvas.width() as i32, 150, [0, 0, 0, 170]);
            let headline = match end.reason {
                EndReason::Cleared => "LEVEL CLEARED",
                _ => "GAME OVER",
            };
            canvas.text_centered(headline, center, middle - 50, 5, HIGHLIGHT);
            let summary = format!("BRICKS {}  FITNESS {:.3}", end.bricks, end.fitness);
            canvas.text_centered(&summary, center, middle + 10, 2, TEXT);
            let hint = "PRESS R TO PLAY AGAIN, ESC TO RETURN";
            canvas.text_centered(hint, center, middle + 40, 2, TEXT);

            if input.key_pressed(VirtualKeyCode::R) || input.key_pressed(VirtualKeyCode::Space) {
                again = true;
                return Frame::Done;
            }
            if input.key_pressed(VirtualKeyCode::Escape) || input.key_pressed(VirtualKeyCode::Q) {
                return Frame::Done;
            }
            Frame::Continue
        });
        again && self.is_open()
    }

    /// Human play until the player quits; returns whether the window is open
    pub fn play(&mut self, settings: &Settings) -> bool {
        let mut speed = 1;
        loop {
            let seed = settings.seed.unwrap_or_else(rand::random);
            let mut episode = Episode::new(
                seed,
                Box::new(HumanController::default()),
                settings.fitness,
                None,
            );
            let Some(end) = self.run_episode(&mut episode, &mut speed, &[]) else {
                return false;
            };
            log::info!(
                "Game ended: {:?}, {} bricks, fitness {:.3}",
                end.reason,
                end.bricks,
                end.fitness
            );
            if end.reason == EndReason::Quit || !self.game_over(&episode, &end) {
                return self.is_open();
            }
        }
    }
}

fn screenshot(canvas: &Canvas<'_>) {
    match canvas.save_png(Path::new(SCREENSHOT_FILE)) {
        Ok(()) => log::info!("Saved screenshot {SCREENSHOT_FILE}"),
        Err(e) => log::warn!("Screenshot failed: {e}"),
    }
}

/// Shows every training episode in the viewer
pub struct WindowRunner<'a> {
    viewer: &'a mut Viewer,
    speed: u32,
}

impl<'a> WindowRunner<'a> {
    pub fn new(viewer: &'a mut Viewer, speed: u32) -> Self {
        Self { viewer, speed }
    }

    pub fn speed(&self) -> u32 {
        self.speed
    }
}

impl EpisodeRunner for WindowRunner<'_> {
    fn run_episode(
        &mut self,
        episode: &mut Episode,
        generation: usize,
        genome: GenomeKey,
    ) -> Result<EpisodeEnd, NeatError> {
        let caption = [format!("GENERATION {generation}  GENOME {genome}")];
        self.viewer
            .run_episode(episode, &mut self.speed, &caption)
            .ok_or(NeatError::Interrupted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticks_follow_wall_time() {
        let mut acc = 0.0;
        assert_eq!(take_ticks(&mut acc, 0.0125, 1), 2);
        assert!((acc - 0.0025).abs() < 1e-6);
        assert_eq!(take_ticks(&mut acc, 0.003, 1), 1);
    }

    #[test]
    fn test_speed_multiplies_ticks() {
        let mut acc = 0.0;
        assert_eq!(take_ticks(&mut acc, 0.0105, 4), 8);
    }

    #[test]
    fn test_long_stall_is_clamped() {
        let mut acc = 0.0;
        assert_eq!(take_ticks(&mut acc, 5.0, 1), 20);
    }

    #[test]
    fn test_backlog_is_dropped() {
        let mut acc = 1.0;
        assert_eq!(take_ticks(&mut acc, 0.0, 1), MAX_SUBSTEPS);
        assert_eq!(acc, 0.0);
    }
}

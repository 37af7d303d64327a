//! NEAT Breakout - launcher window and command line

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};

use neat_breakout::neat::NeatError;
use neat_breakout::neat::params::{self, SECTIONS};
use neat_breakout::settings::{SETTINGS_FILE, Settings};
use neat_breakout::training::{
    EpisodeRunner, HeadlessRunner, TrainingOutcome, run_generation_checkpoint, run_learning,
};
use neat_breakout::ui::dialogs::{self, CHECKPOINT_ERROR, CONFIG_NOT_FOUND};
use neat_breakout::ui::viewer::WINDOW_WIDTH;
use neat_breakout::ui::{Menu, MenuAction, SettingsEditor, Viewer, WindowRunner};

const TITLE: &str = "NEAT Breakout";

#[derive(Debug, Parser)]
#[command(
    name = "neat-breakout",
    version,
    about = "Breakout played by a human or a NEAT-evolved network"
)]
struct Cli {
    /// Application settings file
    #[arg(long, global = true, default_value = SETTINGS_FILE)]
    settings: PathBuf,

    /// NEAT config file, overriding the one in the settings
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Seed for the population and the episodes
    #[arg(long, global = true)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Open the launcher window (default)
    Launcher,
    /// Evolve a new population
    Train {
        /// Evaluate genomes without a window
        #[arg(long)]
        headless: bool,
        /// Stop after this many generations instead of at the fitness threshold
        #[arg(long)]
        generations: Option<usize>,
    },
    /// Evaluate one generation restored from a checkpoint
    Replay {
        checkpoint: PathBuf,
        #[arg(long)]
        headless: bool,
    },
    /// Play with the keyboard
    Play,
    /// List every NEAT config parameter with its default
    Params {
        /// Only this section, e.g. DefaultGenome
        #[arg(long)]
        section: Option<String>,
    },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut settings = Settings::load(&cli.settings);
    if let Some(config) = cli.config {
        settings.neat_config_path = config;
    }
    if cli.seed.is_some() {
        settings.seed = cli.seed;
    }

    match cli.command.unwrap_or(Command::Launcher) {
        Command::Launcher => launcher(settings, &cli.settings),
        Command::Train {
            headless,
            generations,
        } => {
            if !settings.neat_config_path.exists() {
                bail!("{CONFIG_NOT_FOUND}: {}", settings.neat_config_path.display());
            }
            let outcome = with_runner(&settings, headless, |runner| {
                run_learning(&settings.neat_config_path, &settings, runner, generations)
            })?;
            finish_cli("Training", outcome)
        }
        Command::Replay {
            checkpoint,
            headless,
        } => {
            let outcome = with_runner(&settings, headless, |runner| {
                run_generation_checkpoint(&checkpoint, &settings, runner)
            })?;
            finish_cli("Replay", outcome)
        }
        Command::Play => {
            let mut viewer = Viewer::new(TITLE)?;
            viewer.play(&settings);
            Ok(())
        }
        Command::Params { section } => {
            print_params(section.as_deref());
            Ok(())
        }
    }
}

/// Run `f` with a headless runner or a fresh window
fn with_runner<F>(
    settings: &Settings,
    headless: bool,
    f: F,
) -> Result<Result<TrainingOutcome, NeatError>>
where
    F: FnOnce(&mut dyn EpisodeRunner) -> Result<TrainingOutcome, NeatError>,
{
    if headless || settings.headless {
        return Ok(f(&mut HeadlessRunner));
    }
    let mut viewer = Viewer::new(TITLE)?;
    let mut runner = WindowRunner::new(&mut viewer, settings.sim_speed);
    Ok(f(&mut runner))
}

fn finish_cli(what: &str, outcome: Result<TrainingOutcome, NeatError>) -> Result<()> {
    match outcome {
        Ok(outcome) => {
            log::info!("{}", summary(what, &outcome));
            Ok(())
        }
        Err(NeatError::Interrupted) => {
            log::info!("{what} interrupted");
            Ok(())
        }
        Err(e) => Err(e).with_context(|| format!("{what} failed")),
    }
}

fn summary(what: &str, outcome: &TrainingOutcome) -> String {
    let best = outcome
        .best
        .as_ref()
        .map_or_else(|| "-".to_string(), |c| format!("{:.3}", c.fitness));
    format!(
        "{what} stopped before generation {}, best fitness {best}",
        outcome.generation
    )
}

fn print_params(only: Option<&str>) {
    for section in SECTIONS.iter().filter(|s| only.is_none_or(|o| o == **s)) {
        println!("[{section}]  {}", params::section_description(section));
        for spec in params::section_params(section) {
            let default = spec.default.unwrap_or("(required)");
            println!("  {:<40} {:<14} {}", spec.name, default, spec.description);
        }
        println!();
    }
}

/// The configured NEAT file, or one picked by the user when it is missing
fn ensure_config(settings: &mut Settings) -> Option<PathBuf> {
    if settings.neat_config_path.is_file() {
        return Some(settings.neat_config_path.clone());
    }
    dialogs::show_error(
        CONFIG_NOT_FOUND,
        &settings.neat_config_path.display().to_string(),
    );
    let picked = dialogs::pick_config(&settings.neat_config_path)?;
    settings.neat_config_path = picked.clone();
    Some(picked)
}

/// Show the outcome of a run in the menu, errors also as message boxes
fn report(menu: &mut Menu, what: &str, outcome: Result<TrainingOutcome, NeatError>) {
    match outcome {
        Ok(outcome) => menu.set_status(summary(what, &outcome), false),
        Err(NeatError::Interrupted) => menu.set_status(format!("{what} interrupted"), false),
        Err(NeatError::Checkpoint(e)) => {
            dialogs::show_error(CHECKPOINT_ERROR, &e.to_string());
            menu.set_status(CHECKPOINT_ERROR, true);
        }
        Err(NeatError::Config(e)) => {
            dialogs::show_error("config error", &e.to_string());
            menu.set_status(format!("{what} failed: bad config"), true);
        }
        Err(e) => {
            dialogs::show_error(what, &e.to_string());
            menu.set_status(format!("{what} failed"), true);
        }
    }
}

fn run_in_launcher<F>(
    viewer: &mut Viewer,
    settings: &mut Settings,
    f: F,
) -> Result<TrainingOutcome, NeatError>
where
    F: FnOnce(&Settings, &mut dyn EpisodeRunner) -> Result<TrainingOutcome, NeatError>,
{
    if settings.headless {
        viewer.set_title(&format!("{TITLE} - training headless"));
        let outcome = f(settings, &mut HeadlessRunner);
        viewer.set_title(TITLE);
        return outcome;
    }
    let mut runner = WindowRunner::new(viewer, settings.sim_speed);
    let outcome = f(settings, &mut runner);
    settings.sim_speed = runner.speed();
    outcome
}

fn launcher(mut settings: Settings, settings_path: &Path) -> Result<()> {
    let mut viewer = Viewer::new(TITLE)?;
    let mut menu = Menu::new(WINDOW_WIDTH);

    while let Some(action) = viewer.run_menu(&menu, &settings) {
        match action {
            MenuAction::StartTraining => {
                let Some(config_path) = ensure_config(&mut settings) else {
                    continue;
                };
                let outcome = run_in_launcher(&mut viewer, &mut settings, |settings, runner| {
                    run_learning(&config_path, settings, runner, None)
                });
                report(&mut menu, "Training", outcome);
            }
            MenuAction::LoadGeneration => {
                let Some(checkpoint) = dialogs::pick_checkpoint(&settings.checkpoint_root) else {
                    continue;
                };
                let outcome = run_in_launcher(&mut viewer, &mut settings, |settings, runner| {
                    run_generation_checkpoint(&checkpoint, settings, runner)
                });
                report(&mut menu, "Replay", outcome);
            }
            MenuAction::ConfigureSettings => {
                let Some(config_path) = ensure_config(&mut settings) else {
                    continue;
                };
                match SettingsEditor::open(&config_path) {
                    Ok(mut editor) => {
                        viewer.run_editor(&mut editor, &mut settings);
                    }
                    Err(e) => {
                        dialogs::show_error("config error", &e.to_string());
                        menu.set_status("config could not be loaded", true);
                    }
                }
            }
            MenuAction::Play => {
                viewer.play(&settings);
            }
            MenuAction::Quit => break,
        }
        if !viewer.is_open() {
            break;
        }
        if let Err(e) = settings.save(settings_path) {
            log::warn!("Could not save settings: {e:#}");
        }
    }

    settings
        .save(settings_path)
        .with_context(|| format!("saving {}", settings_path.display()))
}

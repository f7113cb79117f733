//! meowboard - Cat Sound Board
//!
//! Plays short cat sounds, one at a time, and converts cat ages and weights.
//!
//! Run without arguments for the interactive shell, or use the subcommands
//! for one-off actions.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};

mod audio;
mod convert;
mod settings;
mod shell;

use audio::{CpalBackend, PlaybackSession};
use convert::{
    cat_to_human, format_one_decimal, human_to_cat, jin_to_kg, kg_to_jin, kg_to_lb, lb_to_kg,
    LifeStage,
};
use settings::{settings_path, AppSettings};
use shell::Shell;

#[derive(Parser)]
#[command(name = "meowboard", version, about = "Cat sound board and cat age/weight calculator")]
struct Cli {
    /// Directory holding the sound assets (overrides settings)
    #[arg(long, global = true)]
    assets: Option<PathBuf>,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// List the available sounds
    List,
    /// Play one sound and wait for it to finish
    Play {
        /// Sound filename or id
        sound: String,
    },
    /// Convert between cat years and human years
    Age(AgeArgs),
    /// Convert between kilograms, pounds and jin
    Weight(WeightArgs),
    /// Show (or write) the settings file
    Settings {
        /// Write the current settings to disk
        #[arg(long)]
        write: bool,
    },
    /// Interactive shell (default)
    Shell,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct AgeArgs {
    /// Cat age in years
    #[arg(long)]
    cat: Option<f64>,
    /// Human age in years
    #[arg(long)]
    human: Option<f64>,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct WeightArgs {
    #[arg(long)]
    kg: Option<f64>,
    #[arg(long)]
    lb: Option<f64>,
    #[arg(long)]
    jin: Option<f64>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();
    log::debug!("Starting meowboard");

    let mut settings = AppSettings::load();
    if let Some(assets) = cli.assets {
        settings.assets_dir = assets;
    }

    match cli.command.unwrap_or(Command::Shell) {
        Command::Age(args) => {
            print_age(args);
            ExitCode::SUCCESS
        }
        Command::Weight(args) => {
            print_weight(args);
            ExitCode::SUCCESS
        }
        Command::Settings { write } => show_settings(&settings, write),
        Command::List => with_session(&settings, |session| {
            for entry in session.catalog().entries() {
                println!(
                    "{:>3}  {:<22} {:<14} {}",
                    entry.id, entry.filename, entry.label, entry.description
                );
            }
            ExitCode::SUCCESS
        }),
        Command::Play { sound } => with_session(&settings, |session| {
            let filename = session
                .catalog()
                .find(&sound)
                .map(|entry| entry.filename.clone())
                .unwrap_or(sound);
            match session.play(&filename) {
                Ok(ticket) => {
                    ticket.wait();
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    log::error!("{}", e);
                    ExitCode::FAILURE
                }
            }
        }),
        Command::Shell => with_session(&settings, |session| {
            let stdin = std::io::stdin();
            match Shell::new(session).run(stdin.lock(), std::io::stdout()) {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    log::error!("Shell error: {}", e);
                    ExitCode::FAILURE
                }
            }
        }),
    }
}

/// Build the catalog and the playback session, then hand the session over
fn with_session(settings: &AppSettings, f: impl FnOnce(&mut PlaybackSession) -> ExitCode) -> ExitCode {
    let catalog = match settings.catalog() {
        Ok(catalog) => Arc::new(catalog),
        Err(e) => {
            log::error!("Failed to load sound catalog: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut session = PlaybackSession::new(
        catalog,
        Box::new(CpalBackend::new()),
        settings.audio_mode(),
        settings.assets_dir.clone(),
    );
    f(&mut session)
}

fn print_age(args: AgeArgs) {
    let (cat, human) = match (args.cat, args.human) {
        (Some(cat), _) => (cat, cat_to_human(cat)),
        (None, Some(human)) => (human_to_cat(human), human),
        (None, None) => return,
    };

    println!(
        "cat {} = human {}",
        format_one_decimal(cat),
        format_one_decimal(human)
    );
    if let Some(stage) = LifeStage::from_human_age(human) {
        println!("{}: {}", stage, stage.hint());
    }
}

fn print_weight(args: WeightArgs) {
    let kg = match (args.kg, args.lb, args.jin) {
        (Some(kg), _, _) => kg,
        (None, Some(lb), _) => lb_to_kg(lb),
        (None, None, Some(jin)) => jin_to_kg(jin),
        (None, None, None) => return,
    };

    println!(
        "{} kg = {} lb = {} jin",
        format_one_decimal(kg),
        format_one_decimal(kg_to_lb(kg)),
        format_one_decimal(kg_to_jin(kg))
    );
}

fn show_settings(settings: &AppSettings, write: bool) -> ExitCode {
    println!("{}", settings_path().display());
    match serde_json::to_string_pretty(settings) {
        Ok(json) => println!("{}", json),
        Err(e) => log::warn!("Failed to serialize settings: {}", e),
    }

    if write && !settings.save() {
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

mod commands;
mod config;
mod driver;
mod input;
mod shutdown;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use offsync_core::BeatmapId;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "offsync")]
#[command(about = "Per-beatmap audio offset manager")]
struct Args {
    /// Config file (TOML). Defaults to the user config directory.
    #[arg(short, long, env = "OFFSYNC_CONFIG")]
    config: Option<PathBuf>,

    /// Beatmap database file (JSON). Overrides the config file.
    #[arg(short, long, env = "OFFSYNC_DATABASE")]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Add a beatmap to the database
    AddBeatmap {
        #[arg(long)]
        set: u32,
        #[arg(long)]
        beatmap: u32,
        /// Audio file name; difficulties with the same audio share an offset
        #[arg(long)]
        audio: String,
        #[arg(long, default_value = "Normal")]
        difficulty: String,
        /// Set title, used when the set is new
        #[arg(long)]
        title: Option<String>,
    },
    /// List every beatmap with its offset
    List,
    /// Show the offset of a beatmap
    Show {
        #[arg(long)]
        beatmap: u32,
    },
    /// Change the offset of a beatmap and its audio siblings
    Set {
        #[arg(long)]
        beatmap: u32,
        /// Offset in milliseconds (clamped to -50..50, 0.1ms steps)
        #[arg(allow_hyphen_values = true)]
        offset: f64,
    },
    /// Calibrate the offset from a score's hit timing
    Calibrate {
        #[arg(long)]
        beatmap: u32,
        /// Reference score file (JSON)
        #[arg(long)]
        score: PathBuf,
        /// Only print the suggestion
        #[arg(long)]
        dry_run: bool,
    },
    /// Print offset changes of a beatmap as they happen
    Watch {
        #[arg(long)]
        beatmap: u32,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("offsync_core=info".parse()?)
                .add_directive("offsync_cli=info".parse()?),
        )
        .init();

    let args = Args::parse();
    let config = config::load(args.config.as_deref(), args.database)?;

    match args.command {
        Command::AddBeatmap {
            set,
            beatmap,
            audio,
            difficulty,
            title,
        } => commands::add::run(
            &config,
            commands::add::NewBeatmap {
                set,
                beatmap,
                audio,
                difficulty,
                title,
            },
        ),
        Command::List => commands::list::run(&config),
        Command::Show { beatmap } => commands::show::run(&config, BeatmapId(beatmap)),
        Command::Set { beatmap, offset } => {
            commands::set::run(&config, BeatmapId(beatmap), offset)
        }
        Command::Calibrate {
            beatmap,
            score,
            dry_run,
        } => commands::calibrate::run(&config, BeatmapId(beatmap), &score, dry_run),
        Command::Watch { beatmap } => commands::watch::run(&config, BeatmapId(beatmap)),
    }
}

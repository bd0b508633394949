#![doc = include_str!("../README.md")]
#![deny(clippy::all)]

use clap::{Parser, Subcommand, ValueEnum};
use hubmap::{settings::MappingSettings, variable::RowOrColumn};
use std::{ffi::OsString, path::PathBuf};

mod decompose;
mod inspect;
mod load;

#[derive(Parser, Debug)]
#[command(name = "hubmap", bin_name = "hubmap")]
#[command(about = "Inspect and reload correspondence maps between a workspace and a hub model")]
struct Cli {
    /// Mapping settings (JSON), defaults apply when omitted
    #[arg(long, global = true, value_name = "SETTINGS")]
    settings: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the correspondences of the identifier map, grouped by workspace variable
    Inspect {
        /// Iteration snapshot (JSON)
        #[arg(value_name = "ITERATION")]
        iteration: PathBuf,
    },
    /// Reload the persisted mappings against a workspace snapshot
    Load {
        /// Iteration snapshot (JSON)
        #[arg(value_name = "ITERATION")]
        iteration: PathBuf,
        /// Workspace snapshot (JSON list of variables)
        #[arg(value_name = "WORKSPACE")]
        workspace: PathBuf,
        /// Which mappings to reload
        #[arg(long, value_enum, default_value_t = Direction::ToHub)]
        direction: Direction,
    },
    /// Split an array variable into the axes of a sampled function
    Decompose {
        /// Workspace snapshot (JSON list of variables)
        #[arg(value_name = "WORKSPACE")]
        workspace: PathBuf,
        /// Name of the array variable
        #[arg(long)]
        variable: String,
        /// Row or column ordinals of the independent axes, in declaration order
        #[arg(long, value_delimiter = ',', required = true)]
        independent: Vec<usize>,
        /// Row or column ordinals of the dependent axes, in declaration order
        #[arg(long, value_delimiter = ',', required = true)]
        dependent: Vec<usize>,
        /// Whether the axes are columns or rows of the array
        #[arg(long, value_enum, default_value_t = Orientation::Column)]
        orientation: Orientation,
        /// Ordinal of the independent axis holding time
        #[arg(long)]
        time_axis: Option<usize>,
        /// Resampling step of the time axis
        #[arg(long, default_value_t = 0.0)]
        time_step: f64,
        /// Average the samples of each step instead of picking the nearest one
        #[arg(long, default_value_t = false)]
        average: bool,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Direction {
    /// Workspace variables written into hub parameters
    ToHub,
    /// Hub value sets read into workspace variables
    ToWorkspace,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Orientation {
    Column,
    Row,
}

impl From<Orientation> for RowOrColumn {
    fn from(value: Orientation) -> Self {
        match value {
            Orientation::Column => RowOrColumn::Column,
            Orientation::Row => RowOrColumn::Row,
        }
    }
}

pub fn entrypoint() -> anyhow::Result<()> {
    entrypoint_from(std::env::args_os())
}

pub fn entrypoint_from<I, T>(args: I) -> anyhow::Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    flexi_logger::Logger::try_with_env_or_str("info")?
        .set_palette("b1;3;2;4;6".to_string())
        .start()?;

    let Cli { settings, command } = Cli::parse_from(args);
    let settings = match settings {
        Some(path) => MappingSettings::from_path(&path)?,
        None => MappingSettings::default(),
    };

    let output = match command {
        Commands::Inspect { iteration } => inspect::inspect(&iteration, settings)?,
        Commands::Load {
            iteration,
            workspace,
            direction,
        } => load::load(&iteration, &workspace, direction, settings)?,
        Commands::Decompose {
            workspace,
            variable,
            independent,
            dependent,
            orientation,
            time_axis,
            time_step,
            average,
        } => decompose::decompose(
            &workspace,
            decompose::DecomposeArgs {
                variable,
                independent,
                dependent,
                orientation: orientation.into(),
                time_axis,
                time_step,
                average,
            },
        )?,
    };
    println!("{output}");

    Ok(())
}

//! Opbundle CLI - Compose, validate and export Operator bundles

use clap::{Parser, Subcommand, ValueEnum};
use opbundle_core::{DescriptionSection, EditorConfig};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod commands;
mod display;
mod error;
mod exit_codes;

use error::{CliError, Result};

#[derive(Parser)]
#[command(name = "opbundle")]
#[command(author = "Opbundle Contributors")]
#[command(version)]
#[command(about = "Compose, validate and export Operator bundles", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Session file (default from config: .opbundle/session.json)
    #[arg(long, global = true, env = "OPBUNDLE_SESSION")]
    session: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a new session from the default manifest
    Init {
        /// Replace an existing session
        #[arg(long)]
        force: bool,
    },

    /// Upload YAML files or directories into the session
    Upload {
        /// Files or directories (.yaml/.yml files are picked up recursively)
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Edit manifest fields (key=value, `package.` prefix edits the package)
    Set {
        /// Field edits
        #[arg(required = true)]
        values: Vec<String>,
    },

    /// Show or replace a section of the long description
    Description {
        /// Section to replace
        #[arg(long, value_enum, requires = "file")]
        section: Option<SectionArg>,

        /// Markdown file with the new section text
        #[arg(long, requires = "section")]
        file: Option<PathBuf>,
    },

    /// Validate the manifest and package
    Validate {
        /// Output validation results as JSON
        #[arg(long)]
        json: bool,

        /// Strict mode - treat warnings as errors
        #[arg(long)]
        strict: bool,
    },

    /// Show upload history
    History {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Export the bundle
    Export {
        /// Output directory (default from config: bundle)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the files instead of writing them
        #[arg(long)]
        stdout: bool,

        /// Export even when validation fails
        #[arg(long)]
        force: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SectionArg {
    App,
    Operator,
    Prerequisites,
}

impl From<SectionArg> for DescriptionSection {
    fn from(arg: SectionArg) -> Self {
        match arg {
            SectionArg::App => DescriptionSection::AboutApplication,
            SectionArg::Operator => DescriptionSection::AboutOperator,
            SectionArg::Prerequisites => DescriptionSection::Prerequisites,
        }
    }
}

fn init_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let config = EditorConfig::load().map_err(CliError::from)?;
    let session_path = cli.session.unwrap_or_else(|| config.session_file.clone());

    match cli.command {
        Commands::Init { force } => commands::init::run(&session_path, force),
        Commands::Upload { paths } => commands::upload::run(&session_path, &paths),
        Commands::Set { values } => commands::set::run(&session_path, &values),
        Commands::Description { section, file } => commands::description::run(
            &session_path,
            section.map(DescriptionSection::from),
            file.as_deref(),
        ),
        Commands::Validate { json, strict } => {
            commands::validate::run(&session_path, json, strict || config.strict)
        }
        Commands::History { json } => commands::history::run(&session_path, json),
        Commands::Export {
            output,
            stdout,
            force,
        } => {
            let output = output.unwrap_or_else(|| config.output_dir.clone());
            commands::export::run(&session_path, &output, stdout, force, &config)
        }
    }
}

fn main() -> ExitCode {
    // Setup miette for nice error display
    miette::set_panic_hook();

    let cli = Cli::parse();
    init_logging(cli.debug);

    match run(cli) {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS as u8),
        Err(err) => {
            let code = err.exit_code();
            eprintln!("{:?}", miette::Report::new(err));
            ExitCode::from(code as u8)
        }
    }
}

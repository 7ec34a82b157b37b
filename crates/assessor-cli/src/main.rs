//! assessor CLI: run modules from answer sheets, score them and compare retakes.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "assessor", version, about = "Assessment module runner and retake scorer")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the components of a generated module
    Module {
        /// Section name (reading, listening, writing, speaking)
        #[arg(long)]
        section: Option<String>,

        /// Module number, starting at 1
        #[arg(long, default_value = "1")]
        number: u32,

        /// Output format: text, json
        #[arg(long, default_value = "text")]
        format: String,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Run a module from an answer sheet and record the first attempt
    Run {
        /// Section name
        #[arg(long)]
        section: Option<String>,

        /// Module number, starting at 1
        #[arg(long, default_value = "1")]
        number: u32,

        /// JSON answer sheet
        #[arg(long)]
        answers: PathBuf,

        /// Output format: text, json, markdown
        #[arg(long, default_value = "text")]
        format: String,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Retake the recorded module of a section and compare
    Retake {
        /// Section name
        #[arg(long)]
        section: Option<String>,

        /// JSON answer sheet for the retake
        #[arg(long)]
        answers: PathBuf,

        /// Also write an HTML comparison to this path
        #[arg(long)]
        html: Option<PathBuf>,

        /// Output format: text, json, markdown
        #[arg(long, default_value = "text")]
        format: String,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Compare two saved attempt records
    Compare {
        /// First attempt JSON
        #[arg(long)]
        first: PathBuf,

        /// Second attempt JSON
        #[arg(long)]
        second: PathBuf,

        /// Also write an HTML comparison to this path
        #[arg(long)]
        html: Option<PathBuf>,

        /// Output format: text, json, markdown
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Show the recorded first attempt of a section
    Show {
        /// Section name
        #[arg(long)]
        section: Option<String>,

        /// Write the record as JSON to this path
        #[arg(long)]
        export: Option<PathBuf>,

        /// Output format: text, json
        #[arg(long, default_value = "text")]
        format: String,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Print the level bands of a section
    Levels {
        /// Section name
        #[arg(long)]
        section: Option<String>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Create a starter config and sample answer sheet
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("assessor=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Module {
            section,
            number,
            format,
            config,
        } => commands::module::execute(section, number, format, config),
        Commands::Run {
            section,
            number,
            answers,
            format,
            config,
        } => commands::run::execute(section, number, answers, format, config).await,
        Commands::Retake {
            section,
            answers,
            html,
            format,
            config,
        } => commands::retake::execute(section, answers, html, format, config).await,
        Commands::Compare {
            first,
            second,
            html,
            format,
        } => commands::compare::execute(first, second, html, format),
        Commands::Show {
            section,
            export,
            format,
            config,
        } => commands::show::execute(section, export, format, config),
        Commands::Levels { section, config } => commands::levels::execute(section, config),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

//! CLI tool for browsing ZIP archives and removing entries from them.

mod commands;
mod exit_codes;
mod output;
mod progress;

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use std::path::PathBuf;

use exit_codes::ExitCode;

/// Browse ZIP archives with legacy-encoded names and delete entries
#[derive(Parser)]
#[command(name = "zipcull")]
#[command(author, version, about = "Browse ZIP archives and delete entries in place", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, short = 'f', value_enum, default_value = "human", global = true)]
    format: OutputFormat,

    /// Suppress progress output
    #[arg(long, short = 'q', global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the directory tree of an archive (alias: t)
    #[command(alias = "t")]
    Tree {
        /// Archive file to show
        archive: PathBuf,
    },

    /// List every entry with size and date (alias: l)
    #[command(alias = "l")]
    List {
        /// Archive file to list
        archive: PathBuf,
    },

    /// Remove entries from an archive (alias: d)
    ///
    /// Directories are removed with everything below them. The archive is
    /// replaced only after the new file has been fully written.
    #[command(alias = "d")]
    Delete {
        /// Archive file to edit
        archive: PathBuf,

        /// Entry paths to remove, as shown by `tree` or `list`
        #[arg(required = true)]
        entries: Vec<String>,

        /// Do not ask for confirmation
        #[arg(short = 'y', long)]
        yes: bool,

        /// Only show what would be removed
        #[arg(short = 'n', long)]
        dry_run: bool,
    },

    /// Extract one entry into a fresh scratch directory and print its path (alias: x)
    #[command(alias = "x")]
    Extract {
        /// Archive file to read
        archive: PathBuf,

        /// Entry path to extract
        entry: String,

        /// Parent directory for the scratch directory
        #[arg(long, env = "ZIPCULL_SCRATCH_DIR")]
        scratch_dir: Option<PathBuf>,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
}

fn main() {
    // Set up Ctrl+C handler
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupted");
        std::process::exit(exit_codes::USER_INTERRUPT);
    })
    .ok();

    let cli = Cli::parse();

    let exit_code = match cli.command {
        Commands::Tree { archive } => commands::tree(&archive, cli.format),

        Commands::List { archive } => commands::list(&archive, cli.format),

        Commands::Delete {
            archive,
            entries,
            yes,
            dry_run,
        } => commands::delete(&commands::DeleteConfig {
            archive_path: &archive,
            entries: &entries,
            yes,
            dry_run,
            format: cli.format,
            quiet: cli.quiet,
        }),

        Commands::Extract {
            archive,
            entry,
            scratch_dir,
        } => commands::extract(&archive, &entry, scratch_dir, cli.format),

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(shell, &mut cmd, name, &mut std::io::stdout());
            ExitCode::Success
        }
    };

    std::process::exit(exit_code.code());
}

// src/main.rs
mod commands;
mod journal;
mod logger;

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use journal::JournalEntry;

#[derive(Parser)]
#[command(name = "huffpack", version = "0.1.0")]
#[command(about = "Static Huffman compression for arbitrary files.", long_about = None)]
struct Cli {
    /// Log debug details (tree shape, stream layout)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Append a JSON line describing each completed operation to this file
    #[arg(long, global = true, value_name = "FILE")]
    journal: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compress a file (default output: INPUT.huf)
    Compress {
        input: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Overwrite the output if it exists
        #[arg(long)]
        force: bool,
    },
    /// Restore a compressed file (default output: INPUT without .huf)
    Decompress {
        input: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Overwrite the output if it exists
        #[arg(long)]
        force: bool,
    },
    /// Compress and restore in memory, then compare SHA-256 digests
    Verify { input: PathBuf },
    /// Show the code tree stored in a compressed file
    Inspect { input: PathBuf },
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    logger::init(logger::level_for(cli.verbose, cli.quiet))?;

    let span = tracing::info_span!("command_execution", command = ?std::env::args().collect::<Vec<_>>());
    let _enter = span.enter();

    match cli.command {
        Commands::Compress {
            input,
            output,
            force,
        } => {
            let output = output.unwrap_or_else(|| commands::default_compressed_path(&input));
            let report = commands::compress_file(&input, &output, force)?;
            record(cli.journal.as_deref(), "compress", &input, Some(&output), &report)?;
        }
        Commands::Decompress {
            input,
            output,
            force,
        } => {
            let output = output.unwrap_or_else(|| commands::default_restored_path(&input));
            let report = commands::decompress_file(&input, &output, force)?;
            record(cli.journal.as_deref(), "decompress", &input, Some(&output), &report)?;
        }
        Commands::Verify { input } => {
            let outcome = commands::verify_file(&input)?;
            record(cli.journal.as_deref(), "verify", &input, None, &outcome)?;
            println!(
                "{}: {} -> {} bytes, sha256 {}",
                input.display(),
                outcome.input_bytes,
                outcome.compressed_bytes,
                if outcome.matches() { "match" } else { "MISMATCH" }
            );
            if !outcome.matches() {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Inspect { input } => commands::inspect_file(&input)?,
    }

    Ok(ExitCode::SUCCESS)
}

fn record<T: serde::Serialize>(
    journal: Option<&Path>,
    action: &str,
    input: &Path,
    output: Option<&Path>,
    report: &T,
) -> anyhow::Result<()> {
    if let Some(journal) = journal {
        let entry = JournalEntry::new(action, input, output, report)?;
        journal::append(journal, &entry)?;
    }
    Ok(())
}

//! Command-line tool for verifying photos

use anyhow::{Context, Result};
use clap::Parser;
use veriframe::{Detail, Engine, Mode};

/// Forensic photo verification tool
#[derive(Parser)]
#[command(name = "veriframe")]
#[command(about = "Analyzes an image for AI generation and manipulation")]
#[command(after_help = "EXAMPLES:\n  \
veriframe photo.jpg                 # Basic verdict as JSON\n  \
veriframe --detailed photo.jpg      # Full per-detector findings\n  \
veriframe --document scan.jpg       # Strict mode (EXIF preserved)")]
struct Cli {
    /// Image file to verify
    file: String,

    /// Include per-detector checks and details in the output
    #[arg(long)]
    detailed: bool,

    /// Treat the input as a document upload (EXIF preserved, strict
    /// validation). Default is photo mode (EXIF-stripping channels).
    #[arg(long)]
    document: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let bytes = std::fs::read(&cli.file).with_context(|| format!("reading {}", cli.file))?;

    let mode = if cli.document {
        Mode::Document
    } else {
        Mode::Photo
    };
    let detail = if cli.detailed {
        Detail::Detailed
    } else {
        Detail::Basic
    };

    let engine = Engine::new();
    let result = engine
        .verify(&bytes, mode, detail)
        .await
        .context("verification failed")?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

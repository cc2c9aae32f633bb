//! # wamas-cli
//!
//! The `wamas` command converts between WAMAS telegrams, ERP records and UBL
//! documents.
//!
//! Results go to stdout or to the file given with `--output`. Nothing is
//! written when a conversion fails.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use wamas_codec::EncodedLine;
use wamas_pipeline::{ConversionConfig, Converter, DictDocument, UblDocument};
use wamas_record::GenericRecord;

#[derive(Parser)]
#[command(name = "wamas")]
#[command(about = "WAMAS telegram converter")]
#[command(version)]
struct Cli {
    /// Path to a YAML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a confirmation telegram into UBL documents
    Wamas2ubl {
        /// Telegram file
        input: PathBuf,

        /// Result format
        #[arg(short, long, value_enum, default_value_t = UblFormat::Ubl)]
        format: UblFormat,

        /// Write the result to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Convert a UBL document into a telegram
    Ubl2wamas {
        /// UBL XML file
        input: PathBuf,

        /// Document type (Reception, Picking, Return)
        #[arg(short = 't', long = "type")]
        document: String,

        /// Result format
        #[arg(short, long, value_enum, default_value_t = WamasFormat::Wamas)]
        format: WamasFormat,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Convert an ERP record in JSON into a telegram
    Dict2wamas {
        /// JSON file
        input: PathBuf,

        /// Record type (Supplier, Customer, Product, Packaging, Barcode,
        /// CustomerDeliveryPreferences)
        #[arg(short = 't', long = "type")]
        document: String,

        #[arg(short, long, value_enum, default_value_t = WamasFormat::Wamas)]
        format: WamasFormat,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Answer a warehouse telegram with its confirmation
    Wamas2wamas {
        input: PathBuf,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Decode a telegram and print its document type and content
    Check { input: PathBuf },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum UblFormat {
    Dict,
    Ubl,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum WamasFormat {
    Dict,
    Wamas,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let converter = match &cli.config {
        Some(path) => {
            let config = ConversionConfig::from_yaml_file(path)?;
            Converter::from_config(&config)?
        }
        None => Converter::new(),
    };

    match cli.command {
        Commands::Wamas2ubl {
            input,
            format,
            output,
        } => {
            let telegram = read_bytes(&input)?;
            let result = match format {
                UblFormat::Dict => converter.wamas_to_dict(&telegram)?.to_json_pretty()?,
                UblFormat::Ubl => converter.wamas_to_ubl(&telegram)?.join("\n"),
            };
            write_output(output.as_deref(), result.as_bytes())
        }
        Commands::Ubl2wamas {
            input,
            document,
            format,
            output,
        } => {
            let document: UblDocument = document.parse()?;
            let xml = read_text(&input)?;
            let lines = converter.ubl_to_records(&xml, document)?;
            write_output(output.as_deref(), &render_lines(&lines, format)?)
        }
        Commands::Dict2wamas {
            input,
            document,
            format,
            output,
        } => {
            let document: DictDocument = document.parse()?;
            let record = GenericRecord::from_json_str(&read_text(&input)?)
                .with_context(|| format!("parsing {}", input.display()))?;
            let lines = converter.dict_to_records(&record, document)?;
            write_output(output.as_deref(), &render_lines(&lines, format)?)
        }
        Commands::Wamas2wamas { input, output } => {
            let telegram = read_bytes(&input)?;
            write_output(output.as_deref(), &converter.wamas_to_wamas(&telegram)?)
        }
        Commands::Check { input } => {
            let report = converter.check(&read_bytes(&input)?)?;
            info!(kind = report.kind.as_str(), lines = report.line_count(), "telegram checked");
            write_output(None, report.to_string().as_bytes())
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Encoded lines as Latin-1 telegram bytes or as JSON
fn render_lines(lines: &[EncodedLine], format: WamasFormat) -> Result<Vec<u8>> {
    Ok(match format {
        WamasFormat::Wamas => wamas_codec::lines_to_bytes(lines),
        WamasFormat::Dict => serde_json::to_string_pretty(lines)?.into_bytes(),
    })
}

fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("reading {}", path.display()))
}

fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn write_output(output: Option<&Path>, content: &[u8]) -> Result<()> {
    match output {
        Some(path) => {
            fs::write(path, content).with_context(|| format!("writing {}", path.display()))?;
            debug!(path = %path.display(), bytes = content.len(), "result written");
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(content)?;
            stdout.write_all(b"\n")?;
        }
    }
    Ok(())
}

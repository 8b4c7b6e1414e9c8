use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::{load::WriteMode, source::SourceFormat};

#[derive(Debug, Parser)]
#[command(author, version, about = "Convert CSV and JSON files into typed warehouse tables", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Infer a typed schema from a file and write the editable preview
    Infer(InferArgs),
    /// Convert every row of a file into typed JSON records
    Convert(ConvertArgs),
    /// Convert a file and load it into a warehouse table
    Load(LoadArgs),
}

#[derive(Debug, Args)]
pub struct InferArgs {
    /// Input CSV or JSON file
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Input format (derived from the file extension when omitted)
    #[arg(long, value_enum)]
    pub format: Option<SourceFormat>,
    /// Destination schema file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ConvertArgs {
    /// Input CSV or JSON file
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Input format (derived from the file extension when omitted)
    #[arg(long, value_enum)]
    pub format: Option<SourceFormat>,
    /// Destination JSONL file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct LoadArgs {
    /// Input CSV or JSON file
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Input format (derived from the file extension when omitted)
    #[arg(long, value_enum)]
    pub format: Option<SourceFormat>,
    /// Warehouse root directory
    #[arg(short = 'w', long = "warehouse")]
    pub warehouse: PathBuf,
    /// Target dataset identifier
    #[arg(short = 'd', long = "dataset")]
    pub dataset: String,
    /// Target table identifier
    #[arg(short = 't', long = "table")]
    pub table: String,
    /// Write mode governing table creation and existing contents
    #[arg(short = 'm', long = "mode", value_enum)]
    pub mode: WriteMode,
    /// Schema file from `infer`, possibly hand-edited (re-inferred from the
    /// input when omitted)
    #[arg(short = 's', long = "schema")]
    pub schema: Option<PathBuf>,
}

pub mod classify;
pub mod cli;
pub mod convert;
pub mod data;
pub mod error;
pub mod identifier;
pub mod load;
pub mod schema;
pub mod source;
pub mod store;
pub mod tokenizer;

use std::{
    env,
    fs::{self, File},
    io::{BufWriter, Write},
    path::Path,
    sync::OnceLock,
};

use anyhow::{Context, Result};
use clap::Parser;
use itertools::Itertools;
use log::{LevelFilter, info, warn};

use crate::{
    cli::{Cli, Commands, ConvertArgs, InferArgs, LoadArgs},
    source::SourceFormat,
    store::{LocalTableStore, TableRef},
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("tablecast", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Infer(args) => handle_infer(&args),
        Commands::Convert(args) => handle_convert(&args),
        Commands::Load(args) => handle_load(&args),
    }
}

fn read_document(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Reading input file {path:?}"))
}

fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    match path {
        Some(p) => Ok(Box::new(BufWriter::new(
            File::create(p).with_context(|| format!("Creating output file {p:?}"))?,
        ))),
        None => Ok(Box::new(std::io::stdout())),
    }
}

fn handle_infer(args: &InferArgs) -> Result<()> {
    let format = SourceFormat::resolve(&args.input, args.format);
    info!(
        "Inferring schema from '{}' as {format}",
        args.input.display()
    );
    let text = read_document(&args.input)?;
    let schema = schema::infer_schema(&text, format)?;

    match &args.output {
        Some(path) => {
            schema
                .save(path)
                .with_context(|| format!("Writing schema to {path:?}"))?;
            info!(
                "Inferred schema with {} field(s) written to {:?}",
                schema.fields.len(),
                path
            );
        }
        None => {
            let rendered =
                serde_json::to_string_pretty(&schema).context("Serializing schema")?;
            println!("{rendered}");
        }
    }
    Ok(())
}

fn handle_convert(args: &ConvertArgs) -> Result<()> {
    let format = SourceFormat::resolve(&args.input, args.format);
    info!("Converting '{}' as {format}", args.input.display());
    let text = read_document(&args.input)?;
    let conversion = convert::convert_all(&text, format)?;

    let mut writer = open_output(args.output.as_deref())?;
    for row in &conversion.rows {
        let line = serde_json::to_string(row).context("Serializing row")?;
        writeln!(writer, "{line}").context("Writing converted row")?;
    }
    writer.flush().context("Flushing converted rows")?;

    info!(
        "Converted {} row(s) ({} dropped)",
        conversion.rows.len(),
        conversion.skipped_rows
    );
    Ok(())
}

fn handle_load(args: &LoadArgs) -> Result<()> {
    let format = SourceFormat::resolve(&args.input, args.format);
    let text = read_document(&args.input)?;

    let schema = match &args.schema {
        Some(path) => schema::Schema::load(path)?,
        None => schema::infer_schema(&text, format)?,
    };

    let conversion = convert::convert_all(&text, format)?;

    let table = TableRef::new(&args.dataset, &args.table);
    let mut store = LocalTableStore::open(&args.warehouse)
        .with_context(|| format!("Opening warehouse at {:?}", args.warehouse))?;

    let report = load::load(&mut store, &table, args.mode, &schema, &conversion.rows)?;

    info!(
        "Loaded {} of {} row(s) into '{}' ({} mode)",
        report.rows_inserted, report.total_rows, report.table, report.mode
    );
    if conversion.skipped_rows > 0 {
        info!(
            "{} malformed row(s) were dropped during conversion",
            conversion.skipped_rows
        );
    }
    if report.batches_failed > 0 {
        warn!(
            "{} batch(es) failed: {}",
            report.batches_failed,
            report.failures.iter().join("; ")
        );
    }
    Ok(())
}

//! Reshape CLI - Command-line tool for reshaping JSON records
//!
//! This binary provides command-line interfaces for:
//! - run: transform NDJSON / JSON array input with a config file
//! - check: validate a config file and list its field maps

mod config;

use clap::{Parser, Subcommand, ValueEnum};
use config::ReshapeConfig;
use indicatif::{ProgressBar, ProgressStyle};
use reshape_engine::{FieldMapProvider, Hook};
use reshape_io::{
    readable_stream_from, NdjsonSink, NdjsonSource, ObjectStream, OutputFormat, PullSource,
    PushSink, SinkEvent, SinkEventKind,
};
use serde_json::Value;
use std::cell::RefCell;
use std::error::Error;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::{Duration, Instant};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "reshape")]
#[command(about = "Reshape JSON records with per-object field maps")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace). RESHAPE_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Transform records from a JSON array or NDJSON file
    ///
    /// Examples:
    ///   reshape run input.ndjson --config reshape.toml
    ///   reshape run input.json -o out.json --config reshape.json --json-array
    Run {
        /// Input file (JSON array or NDJSON)
        input: PathBuf,
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Config file (.toml or .json)
        #[arg(short, long)]
        config: PathBuf,
        /// Input layout (detected from the extension by default)
        #[arg(long, value_enum)]
        input_format: Option<InputFormat>,
        /// Write a JSON array instead of NDJSON
        #[arg(long = "json-array")]
        json_array: bool,
        /// Show progress spinner while transforming
        #[arg(long)]
        progress: bool,
    },
    /// Validate a config file and list object names with their field maps
    Check {
        /// Config file (.toml or .json)
        #[arg(short, long)]
        config: PathBuf,
    },
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum InputFormat {
    Ndjson,
    #[value(name = "json-array")]
    JsonArray,
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run {
            input,
            output,
            config,
            input_format,
            json_array,
            progress,
        } => {
            handle_run(input, output, config, input_format, json_array, progress)?;
        }
        Commands::Check { config } => {
            handle_check(&config)?;
        }
    }

    Ok(())
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_env("RESHAPE_LOG").unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn handle_run(
    input: PathBuf,
    output: Option<PathBuf>,
    config_path: PathBuf,
    input_format: Option<InputFormat>,
    json_array: bool,
    show_progress: bool,
) -> Result<(), Box<dyn Error>> {
    let start = Instant::now();
    let config = ReshapeConfig::load(&config_path)?;
    let options = config.to_options()?;
    let format = input_format.unwrap_or_else(|| detect_input_format(&input));
    debug!(input = %input.display(), ?format, "opening input");

    let source = open_source(&input, format)?;
    let stream = ObjectStream::new(source, options);

    let writer: Box<dyn Write> = match &output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(BufWriter::new(std::io::stdout())),
    };
    let layout = if json_array {
        OutputFormat::JsonArray
    } else {
        OutputFormat::Ndjson
    };
    let sink = Rc::new(NdjsonSink::with_format(writer, layout));

    let failure = Rc::new(RefCell::new(None::<String>));
    let slot = Rc::clone(&failure);
    sink.events().on(SinkEventKind::Error, move |event| {
        if let SinkEvent::Error(message) = event {
            slot.borrow_mut().get_or_insert_with(|| message.clone());
        }
    });

    let progress_bar = show_progress.then(|| create_spinner("Transforming records"));
    if let Some(pb) = progress_bar.clone() {
        stream.on(Hook::data(move |_| pb.inc(1)));
    }

    stream.pipe(Rc::clone(&sink))?;

    if let Some(message) = failure.borrow_mut().take() {
        return Err(message.into());
    }

    let elapsed = start.elapsed();
    let records = stream.emitted();
    let rate = records as f64 / elapsed.as_secs_f64().max(f64::EPSILON);
    if let Some(pb) = progress_bar {
        pb.finish_with_message(format!(
            "Transformed {} records in {:.2?} ({:.1} rec/s)",
            records, elapsed, rate
        ));
    }
    info!(records, ?elapsed, "transform complete");

    if let Some(path) = &output {
        let mut stderr = std::io::stderr().lock();
        writeln!(
            &mut stderr,
            "Transformed {} records to {} (elapsed: {:.2?}, {:.1} rec/s)",
            records,
            path.display(),
            elapsed,
            rate
        )?;
    }
    Ok(())
}

fn detect_input_format(path: &Path) -> InputFormat {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|s| s.to_ascii_lowercase())
    {
        Some(ext) if ext == "json" => InputFormat::JsonArray,
        _ => InputFormat::Ndjson,
    }
}

fn open_source(path: &Path, format: InputFormat) -> Result<Box<dyn PullSource>, Box<dyn Error>> {
    let file = File::open(path)?;

    match format {
        InputFormat::Ndjson => Ok(Box::new(NdjsonSource::new(BufReader::new(file)))),
        InputFormat::JsonArray => {
            let value: Value = serde_json::from_reader(BufReader::new(file))?;
            let items = match value {
                Value::Array(items) => items,
                single => vec![single],
            };
            Ok(Box::new(readable_stream_from(items)))
        }
    }
}

fn handle_check(config_path: &Path) -> Result<(), Box<dyn Error>> {
    let config = ReshapeConfig::load(config_path)?;
    config.to_options()?;
    let mapper = config.field_mapper()?;

    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "root_name: {}", config.root_name)?;
    writeln!(stdout, "unmapped: {:?}", config.unmapped)?;
    if !config.skip_props.is_empty() {
        writeln!(stdout, "skip_props: {}", config.skip_props.join(", "))?;
    }
    for rule in &config.custom_tags {
        writeln!(stdout, "custom_tag: {} ({})", rule.tag, rule.base)?;
    }

    for name in mapper.object_names() {
        writeln!(stdout, "{}:", name)?;
        if let Some(object_map) = mapper.object_map(name) {
            for rule in object_map.rules() {
                writeln!(stdout, "  {} -> {}", rule.field_name, rule.property_name)?;
            }
        }
    }

    Ok(())
}

fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {pos} {msg}")
            .unwrap(),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

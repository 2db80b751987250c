use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use bitwin_common::{ContextSize, EncodeError, EncoderConfig, Granularity};
use bitwin_core::{NoopObserver, ProgressObserver};
use bitwin_dataset::{
    auto_shape, convert, describe_label, hex_dump, parse_shape, printable_text, render_grid, DatasetSummary,
    MmapDataset,
};

/// Any failure without a more specific code below.
const EXIT_FAILURE: u8 = 1;
/// A conversion that wrote a dataset but produced no examples.
const EXIT_EMPTY: u8 = 2;
/// Bad flags or config file, detected before any input is read. Also used
/// for command-line usage errors.
const EXIT_CONFIG: u8 = 3;

#[derive(Parser, Debug)]
#[command(name = "bitwin", version, about = "Turn byte streams into bit-window datasets")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert a file into a .bwds dataset of (bit window, next-bytes label) pairs.
    Convert(ConvertArgs),
    /// Print a summary of a .bwds dataset.
    Info(InfoArgs),
    /// Print one sample of a .bwds dataset.
    Show(ShowArgs),
    /// Write a default encoder config file.
    InitConfig(InitConfigArgs),
}

// ── Convert ────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
struct ConvertArgs {
    /// Input file (any bytes; usually text).
    input: PathBuf,
    /// Output dataset file.
    output: PathBuf,
    /// Label granularity: bytes following each window packed into the label.
    #[arg(long, value_parser = ["unigram", "bigram", "trigram"])]
    chunk: String,
    /// Context size in bytes (window = 8 × this many bits). Overrides --config.
    #[arg(long, allow_negative_numbers = true)]
    context_size: Option<i64>,
    /// JSON encoder config; flags take precedence over its values.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Compute windows in parallel (output is identical).
    #[arg(long)]
    parallel: bool,
    /// Progress update interval in examples.
    #[arg(long)]
    progress_every: Option<usize>,
    /// Exit 0 even when no examples were produced.
    #[arg(long)]
    allow_empty: bool,
    /// No progress bar.
    #[arg(long, short)]
    quiet: bool,
}

// ── Info / Show ────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
struct InfoArgs {
    dataset: PathBuf,
    /// Print the summary as JSON.
    #[arg(long)]
    json: bool,
    /// Number of most frequent labels to list.
    #[arg(long, default_value_t = 10)]
    top: usize,
}

#[derive(Parser, Debug)]
struct ShowArgs {
    dataset: PathBuf,
    /// Sample ordinal.
    #[arg(long, short, default_value_t = 0)]
    index: usize,
    /// Display shape as RxC (defaults to the squarest factorisation).
    #[arg(long)]
    shape: Option<String>,
}

#[derive(Parser, Debug)]
struct InitConfigArgs {
    #[arg(long, default_value = "bitwin.json")]
    output: PathBuf,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return if err.use_stderr() {
                ExitCode::from(EXIT_CONFIG)
            } else {
                ExitCode::SUCCESS
            };
        }
    };
    let result = match cli.command {
        Command::Convert(args) => cmd_convert(args),
        Command::Info(args) => cmd_info(args),
        Command::Show(args) => cmd_show(args),
        Command::InitConfig(args) => cmd_init_config(args),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(exit_code(&err))
        }
    }
}

/// Map a command failure to the process exit code.
fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<EncodeError>() {
        Some(EncodeError::EmptyResult) => EXIT_EMPTY,
        Some(e) if e.is_configuration() => EXIT_CONFIG,
        _ => EXIT_FAILURE,
    }
}

// ── Progress ───────────────────────────────────────────────────────────────────

/// Drives an indicatif bar from encoder checkpoints.
struct BarObserver {
    bar: ProgressBar,
}

impl BarObserver {
    fn new() -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40} {pos}/{len} samples")
                .unwrap()
                .progress_chars("=>-"),
        );
        Self { bar }
    }
}

impl ProgressObserver for BarObserver {
    fn on_start(&self, total: usize) {
        self.bar.set_length(total as u64);
    }

    fn on_checkpoint(&self, done: usize, _total: usize) {
        self.bar.set_position(done as u64);
    }

    fn on_finish(&self, done: usize) {
        self.bar.set_position(done as u64);
        self.bar.finish_and_clear();
    }
}

// ── Command implementations ────────────────────────────────────────────────────

fn build_config(args: &ConvertArgs) -> Result<EncoderConfig> {
    let mut config = match &args.config {
        Some(path) => EncoderConfig::load(path)
            .with_context(|| format!("load config {}", path.display()))?,
        None => EncoderConfig::default(),
    };
    config.granularity = args.chunk.parse::<Granularity>()?;
    if let Some(c) = args.context_size {
        config.context_size = ContextSize::try_from(c)?.bytes();
    }
    if let Some(every) = args.progress_every {
        config.progress_every = every;
    }
    config.parallel |= args.parallel;
    config.validate()?;
    Ok(config)
}

fn cmd_convert(args: ConvertArgs) -> Result<()> {
    let config = build_config(&args)?;
    tracing::info!(
        input = %args.input.display(),
        context_size = config.context_size,
        granularity = %config.granularity,
        parallel = config.parallel,
        "converting"
    );

    let report = if args.quiet {
        convert(&args.input, &args.output, &config, &NoopObserver)
    } else {
        convert(&args.input, &args.output, &config, &BarObserver::new())
    }
    .with_context(|| format!("convert {}", args.input.display()))?;

    println!("Dataset created with {} samples", report.examples);
    println!("Saved dataset to {}", report.output.display());

    if !args.allow_empty {
        report.ensure_nonempty().with_context(|| {
            format!(
                "no samples: input has {} bytes, need at least 1",
                report.input_bytes
            )
        })?;
    }
    Ok(())
}

fn cmd_info(args: InfoArgs) -> Result<()> {
    let dataset = MmapDataset::open(&args.dataset)
        .with_context(|| format!("open {}", args.dataset.display()))?;
    let container = dataset.to_container()?;
    let summary = DatasetSummary::from_container(&container, Some(dataset.file_len()), args.top);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    let fmt_opt = |v: Option<u8>| v.map_or_else(|| "n/a".to_string(), |v| v.to_string());
    println!("Dataset:        {}", args.dataset.display());
    println!("File size:      {} bytes", dataset.file_len());
    println!("Samples:        {}", summary.examples);
    println!("Feature width:  {} bits", summary.feature_width);
    println!("Context size:   {} bytes", summary.context_size);
    println!("Granularity:    {}", summary.granularity);
    println!("Shape (auto):   {:?}", auto_shape(summary.feature_width));
    println!("Min value:      {}", fmt_opt(summary.min_feature));
    println!("Max value:      {}", fmt_opt(summary.max_feature));
    println!("Distinct labels: {}", summary.distinct_labels);
    println!("Plausible:      {}", summary.plausible);
    if !summary.top_labels.is_empty() {
        println!("Top labels:");
        for (label, count) in &summary.top_labels {
            println!("  {:>8}  {}", count, describe_label(*label, summary.granularity));
        }
    }
    Ok(())
}

fn cmd_show(args: ShowArgs) -> Result<()> {
    let dataset = MmapDataset::open(&args.dataset)
        .with_context(|| format!("open {}", args.dataset.display()))?;
    let sample = dataset.get(args.index).with_context(|| {
        format!(
            "index {} out of range (dataset has {} samples)",
            args.index,
            dataset.len()
        )
    })?;

    let width = dataset.feature_width();
    let shape = match &args.shape {
        Some(s) => parse_shape(s, width)
            .with_context(|| format!("shape {s} does not cover {width} features"))?,
        None => auto_shape(width),
    };
    let granularity = dataset.meta().granularity;

    println!("Sample {} / {}", sample.index, dataset.len());
    println!("Label:  {}", describe_label(sample.label, granularity));
    println!();
    print!("{}", render_grid(&sample.bits(), shape));
    println!();
    println!("Text:   {}", printable_text(sample.packed));
    println!();
    print!("{}", hex_dump(sample.packed));
    Ok(())
}

fn cmd_init_config(args: InitConfigArgs) -> Result<()> {
    EncoderConfig::default()
        .save(&args.output)
        .with_context(|| format!("write {}", args.output.display()))?;
    eprintln!("Wrote default config to {}", args.output.display());
    Ok(())
}

//! tagsr CLI: evaluate enhancement models in front of an ArUco detector.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use tagsr_aruco::{ArucoDetector, ArucoDetectorParams, Dictionary};
use tagsr_eval::{
    gray_view, load_gray, run_evaluation, EvaluationConfig, ModelSpec, PipelineMode, Protocol,
    RuntimeConfig, MODEL_FILE,
};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "tagsr")]
#[command(about = "Measure how super-resolution and denoise models change ArUco detection rates")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    log: LogArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an evaluation over a folder of marker images.
    Evaluate(EvaluateArgs),

    /// Print the marker ids found in images.
    Detect(DetectArgs),

    /// Print the description of a model directory.
    InspectModel {
        /// Model directory (containing model.json).
        dir: PathBuf,
    },
}

#[derive(Debug, Clone, Args)]
struct LogArgs {
    /// Log verbosity.
    #[arg(long, global = true, value_enum, default_value_t = LogLevelArg::Info)]
    log_level: LogLevelArg,

    /// Log through `tracing` (requires the `tracing` feature).
    #[arg(long, global = true)]
    tracing: bool,

    /// Emit tracing events as JSON.
    #[arg(long, global = true, requires = "tracing")]
    json_logs: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevelArg {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevelArg> for LevelFilter {
    fn from(l: LogLevelArg) -> Self {
        match l {
            LogLevelArg::Off => LevelFilter::Off,
            LogLevelArg::Error => LevelFilter::Error,
            LogLevelArg::Warn => LevelFilter::Warn,
            LogLevelArg::Info => LevelFilter::Info,
            LogLevelArg::Debug => LevelFilter::Debug,
            LogLevelArg::Trace => LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ProtocolArg {
    SingleTag,
    FalseNegative,
}

impl From<ProtocolArg> for Protocol {
    fn from(p: ProtocolArg) -> Self {
        match p {
            ProtocolArg::SingleTag => Protocol::SingleTag,
            ProtocolArg::FalseNegative => Protocol::FalseNegative,
        }
    }
}

#[derive(Debug, Clone, Args)]
struct EvaluateArgs {
    /// JSON run configuration. Flags given on the command line override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Pipeline mode: SR, DN, SRDN or DNSR.
    #[arg(long)]
    mode: Option<PipelineMode>,

    /// Model directory (the model applied first in chained modes).
    #[arg(long)]
    model: Option<PathBuf>,

    /// Second model directory, required by SRDN and DNSR.
    #[arg(long)]
    second_model: Option<PathBuf>,

    /// Folder with the evaluation images.
    #[arg(long)]
    images: Option<PathBuf>,

    /// Image extension to include (repeatable).
    #[arg(long = "ext")]
    extensions: Vec<String>,

    /// Fraction of the images to evaluate, in (0, 1].
    #[arg(long)]
    fraction: Option<f64>,

    /// Require the detected id to match the id in the file name.
    #[arg(long, overrides_with = "no_verify_id")]
    verify_id: bool,

    /// Accept any single detected id, even if the config file enables
    /// `verify_id`.
    #[arg(long, overrides_with = "verify_id")]
    no_verify_id: bool,

    /// Seed for the random sample selection.
    #[arg(long)]
    seed: Option<u64>,

    #[arg(long, value_enum)]
    protocol: Option<ProtocolArg>,

    /// ArUco dictionary JSON.
    #[arg(long)]
    dictionary: Option<PathBuf>,

    /// Root folder for chained-mode reports.
    #[arg(long)]
    output_root: Option<PathBuf>,
}

impl EvaluateArgs {
    fn to_config(&self) -> CliResult<EvaluationConfig> {
        let mut cfg = match &self.config {
            Some(path) => EvaluationConfig::load_json(path)?,
            None => {
                let missing = |flag: &str| format!("--{flag} is required without --config");
                EvaluationConfig::new(
                    self.mode.ok_or_else(|| missing("mode"))?,
                    self.model.clone().ok_or_else(|| missing("model"))?,
                    self.images.clone().ok_or_else(|| missing("images"))?,
                    self.dictionary.clone().ok_or_else(|| missing("dictionary"))?,
                )
            }
        };

        if let Some(mode) = self.mode {
            cfg.mode = mode;
        }
        if let Some(model) = &self.model {
            cfg.model = model.clone();
        }
        if let Some(second) = &self.second_model {
            cfg.second_model = Some(second.clone());
        }
        if let Some(images) = &self.images {
            cfg.images = images.clone();
        }
        if !self.extensions.is_empty() {
            cfg.extensions = self.extensions.clone();
        }
        if let Some(fraction) = self.fraction {
            cfg.sample_fraction = fraction;
        }
        if self.verify_id {
            cfg.verify_id = true;
        } else if self.no_verify_id {
            cfg.verify_id = false;
        }
        if self.seed.is_some() {
            cfg.seed = self.seed;
        }
        if let Some(protocol) = self.protocol {
            cfg.protocol = protocol.into();
        }
        if let Some(dictionary) = &self.dictionary {
            cfg.dictionary = dictionary.clone();
        }
        if let Some(root) = &self.output_root {
            cfg.output_root = root.clone();
        }
        Ok(cfg)
    }
}

#[derive(Debug, Clone, Args)]
struct DetectArgs {
    /// ArUco dictionary JSON.
    #[arg(long)]
    dictionary: PathBuf,

    /// Detector parameters JSON (partial objects allowed).
    #[arg(long)]
    params: Option<PathBuf>,

    /// Print full detections as JSON instead of ids.
    #[arg(long)]
    json: bool,

    /// Images to scan.
    #[arg(required = true)]
    images: Vec<PathBuf>,
}

fn init_logging(args: &LogArgs) {
    let runtime = RuntimeConfig {
        log_level: args.log_level.into(),
        tracing: args.tracing,
        json_logs: args.json_logs,
    };
    runtime.init();
    #[cfg(not(feature = "tracing"))]
    {
        if runtime.tracing {
            log::warn!("built without the `tracing` feature; using the plain logger");
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli.log);

    let result = match &cli.command {
        Commands::Evaluate(args) => run_evaluate(args),
        Commands::Detect(args) => run_detect(args),
        Commands::InspectModel { dir } => run_inspect_model(dir),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            let mut source = err.source();
            while let Some(cause) = source {
                eprintln!("  caused by: {cause}");
                source = cause.source();
            }
            ExitCode::FAILURE
        }
    }
}

fn run_evaluate(args: &EvaluateArgs) -> CliResult<()> {
    let cfg = args.to_config()?;
    let eval = run_evaluation(&cfg)?;
    println!("{}", eval.report);
    println!("Report written to {}", eval.report_path.display());
    Ok(())
}

fn run_detect(args: &DetectArgs) -> CliResult<()> {
    let dict = Dictionary::load_json(&args.dictionary)?;
    let params = match &args.params {
        Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
        None => ArucoDetectorParams::default(),
    };
    let detector = ArucoDetector::new(dict, params);

    for path in &args.images {
        let image = load_gray(path)?;
        let detections = detector.detect(&gray_view(&image));
        if args.json {
            let out = serde_json::json!({
                "image": path.display().to_string(),
                "detections": detections,
            });
            println!("{out}");
        } else {
            let mut ids: Vec<u32> = detections.iter().map(|d| d.id).collect();
            ids.sort_unstable();
            println!("{}\t{ids:?}", path.display());
        }
    }
    Ok(())
}

fn run_inspect_model(dir: &std::path::Path) -> CliResult<()> {
    let spec = ModelSpec::load(dir)
        .map_err(|e| format!("{}: {e}", dir.join(MODEL_FILE).display()))?;
    println!("name: {}", tagsr_eval::model_name(dir));
    println!("kind: {}", spec.kind());
    println!("{}", serde_json::to_string_pretty(&spec)?);
    Ok(())
}

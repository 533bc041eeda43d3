#![warn(missing_docs)]
//! Sandbench CLI Library
//!
//! Command-line front end over the sandbench engine:
//! - `validate`: screen a snippet against the pattern catalog
//! - `run`: validate and measure one snippet
//! - `compare`: measure two snippets concurrently and report the difference
//! - `patterns`: list the active catalog
//! - `init`: print a default `sandbench.toml`
//!
//! Rejected snippets exit with code 2 so scripts can tell them apart from
//! runtime errors (code 1).

mod config;
mod metadata;
mod progress;

pub use config::*;
pub use metadata::{build_report_meta, system_info};
pub use progress::RunProgress;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sandbench_core::{
    BenchError, BenchmarkConfig, Benchmarker, ContextProvider, RunRole, SecurityConfig,
};
use sandbench_guard::{CodeRejection, CodeValidator, InputError, PatternCatalog};
use sandbench_report::{
    OutputFormat, RejectionInfo, Report, format_human_output, generate_json_report,
};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Sandbench CLI arguments
#[derive(Parser, Debug)]
#[command(name = "sandbench")]
#[command(author, version, about = "Sandbench - sandboxed JavaScript snippet benchmarks")]
pub struct Cli {
    /// Subcommand
    #[command(subcommand)]
    pub command: Commands,

    /// Output format: json, human (default from sandbench.toml)
    #[arg(long, global = true)]
    pub format: Option<String>,

    /// Output file (stdout if not specified)
    #[arg(short, long, global = true)]
    pub output: Option<PathBuf>,

    /// Configuration file (skips discovery of sandbench.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Unmeasured iterations before sampling
    #[arg(long, global = true)]
    pub warmup: Option<usize>,

    /// Minimum number of samples
    #[arg(long, global = true)]
    pub min_samples: Option<usize>,

    /// Maximum number of samples
    #[arg(long, global = true)]
    pub max_samples: Option<usize>,

    /// Sampling time budget (e.g., "5s", "500ms")
    #[arg(long, global = true)]
    pub budget: Option<String>,

    /// Per-sample timeout (e.g., "5s", "250ms")
    #[arg(long, global = true)]
    pub timeout: Option<String>,

    /// Run snippets in isolated contexts
    /// Use --isolated=false for direct evaluation
    #[arg(long, global = true, action = clap::ArgAction::Set)]
    pub isolated: Option<bool>,

    /// Interpreter binary for worker processes
    #[arg(long, global = true)]
    pub interpreter: Option<String>,

    /// Pattern catalog: standard or extended
    #[arg(long, global = true)]
    pub catalog: Option<CatalogChoice>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// CLI subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Screen a snippet without running it
    Validate {
        /// Snippet file
        file: PathBuf,
    },
    /// Validate and benchmark a snippet
    Run {
        /// Snippet file
        file: PathBuf,
    },
    /// Benchmark two snippets and compare them
    Compare {
        /// Baseline snippet file
        baseline: PathBuf,
        /// Candidate snippet file
        candidate: PathBuf,
    },
    /// List the dangerous patterns in the active catalog
    Patterns,
    /// Print a default sandbench.toml
    Init,
}

/// How a command ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Command finished
    Success,
    /// At least one snippet was rejected by validation
    Rejected,
}

impl Outcome {
    /// Process exit code
    pub fn exit_code(self) -> i32 {
        match self {
            Outcome::Success => 0,
            Outcome::Rejected => 2,
        }
    }
}

/// Effective settings after layering sandbench.toml and CLI flags
#[derive(Debug, Clone)]
pub struct Settings {
    /// Sampling configuration
    pub config: BenchmarkConfig,
    /// Isolated context restrictions
    pub security: SecurityConfig,
    /// Active pattern catalog
    pub catalog: CatalogChoice,
    /// Interpreter for worker processes
    pub interpreter: String,
    /// Output format
    pub format: OutputFormat,
}

impl Settings {
    /// Layer CLI overrides on top of the configuration file
    pub fn resolve(cli: &Cli, file: &SandbenchConfig) -> anyhow::Result<Self> {
        let mut config = file.benchmark_config()?;
        let security = file.security_config()?;

        if let Some(warmup) = cli.warmup {
            config.warmup_iterations = warmup;
        }
        if let Some(min) = cli.min_samples {
            config.min_samples = min;
        }
        if let Some(max) = cli.max_samples {
            config.max_samples = max;
        }
        if let Some(ref budget) = cli.budget {
            config.max_time_budget =
                SandbenchConfig::parse_duration(budget).context("invalid --budget")?;
        }
        if let Some(ref timeout) = cli.timeout {
            config.execution_timeout =
                SandbenchConfig::parse_duration(timeout).context("invalid --timeout")?;
        }
        if let Some(isolated) = cli.isolated {
            config.use_isolated_context = isolated;
        }
        config.validate()?;

        let format_name = cli.format.as_deref().unwrap_or(&file.output.format);
        let format: OutputFormat = format_name.parse().map_err(anyhow::Error::msg)?;

        Ok(Self {
            config,
            security,
            catalog: cli.catalog.unwrap_or(file.runner.catalog),
            interpreter: cli
                .interpreter
                .clone()
                .unwrap_or_else(|| file.runner.interpreter.clone()),
            format,
        })
    }

    fn validator(&self) -> CodeValidator {
        CodeValidator::new(Arc::new(self.catalog.build()))
    }
}

/// Run the Sandbench CLI with process arguments.
pub fn run() -> anyhow::Result<Outcome> {
    let cli = Cli::parse();
    run_with_cli(cli)
}

/// Run the Sandbench CLI with pre-parsed arguments.
pub fn run_with_cli(cli: Cli) -> anyhow::Result<Outcome> {
    let filter = if cli.verbose {
        "sandbench=debug"
    } else {
        "sandbench=info"
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let file_config = match cli.config {
        Some(ref path) => SandbenchConfig::load(path)?,
        None => SandbenchConfig::discover().unwrap_or_default(),
    };
    let settings = Settings::resolve(&cli, &file_config)?;

    let (output, outcome) = execute(&cli.command, &settings)?;
    write_output(cli.output.as_deref(), &output)?;
    Ok(outcome)
}

/// Run one command and render its output
pub fn execute(command: &Commands, settings: &Settings) -> anyhow::Result<(String, Outcome)> {
    match command {
        Commands::Validate { file } => validate_file(file, settings),
        Commands::Run { file } => run_file(file, settings),
        Commands::Compare {
            baseline,
            candidate,
        } => compare_files(baseline, candidate, settings),
        Commands::Patterns => list_patterns(settings),
        Commands::Init => Ok((SandbenchConfig::default_toml(), Outcome::Success)),
    }
}

fn write_output(path: Option<&Path>, output: &str) -> anyhow::Result<()> {
    match path {
        Some(path) => {
            let mut file = std::fs::File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            file.write_all(output.as_bytes())?;
            eprintln!("Report written to: {}", path.display());
        }
        None => print!("{}", output),
    }
    Ok(())
}

/// Snippet text, or the rejection for bytes that are not text
fn read_snippet(path: &Path) -> anyhow::Result<Result<String, CodeRejection>> {
    let bytes =
        std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    Ok(String::from_utf8(bytes).map_err(|_| CodeRejection::from(InputError::NotText)))
}

fn validate_file(path: &Path, settings: &Settings) -> anyhow::Result<(String, Outcome)> {
    let validator = settings.validator();
    let result = read_snippet(path)?
        .and_then(|code| validator.validate(&code, settings.config.max_code_size));
    let label = path.display().to_string();

    let outcome = if result.is_ok() {
        Outcome::Success
    } else {
        Outcome::Rejected
    };
    let output = match settings.format {
        OutputFormat::Json => {
            let value = serde_json::json!({
                "file": label,
                "valid": result.is_ok(),
                "rejection": result.as_ref().err().map(RejectionInfo::from),
            });
            format!("{}\n", serde_json::to_string_pretty(&value)?)
        }
        OutputFormat::Human => match result {
            Ok(()) => format!(
                "✓ {}: no dangerous patterns ({} detectors checked)\n",
                label,
                validator.catalog().len()
            ),
            Err(rejection) => format!("✗ {}: [{}] {}\n", label, rejection.code(), rejection),
        },
    };
    Ok((output, outcome))
}

fn run_file(path: &Path, settings: &Settings) -> anyhow::Result<(String, Outcome)> {
    let label = path.display().to_string();
    let mut report = Report::new(build_report_meta(&settings.config, engine_label(settings)));

    let outcome = match read_snippet(path)? {
        Err(rejection) => {
            report.push_rejection(&label, &rejection);
            Outcome::Rejected
        }
        Ok(code) => {
            let progress = Arc::new(RunProgress::new(&[RunRole::Single], &settings.config));
            let benchmarker = build_benchmarker(settings, Arc::clone(&progress))?;
            let result = benchmarker.benchmark(&code);
            progress.finish();
            match result {
                Ok(run) => {
                    report.push_run(&label, &run);
                    Outcome::Success
                }
                Err(BenchError::Rejected(rejection)) => {
                    report.push_rejection(&label, &rejection);
                    Outcome::Rejected
                }
                Err(e) => return Err(e.into()),
            }
        }
    };

    Ok((render(&report, settings.format)?, outcome))
}

fn compare_files(
    baseline: &Path,
    candidate: &Path,
    settings: &Settings,
) -> anyhow::Result<(String, Outcome)> {
    let baseline_label = baseline.display().to_string();
    let candidate_label = candidate.display().to_string();
    let mut report = Report::new(build_report_meta(&settings.config, engine_label(settings)));

    // Screen both up front so a rejection names the offending file.
    let validator = settings.validator();
    let screen = |path: &Path| -> anyhow::Result<Result<String, CodeRejection>> {
        Ok(read_snippet(path)?.and_then(|code| {
            validator
                .validate(&code, settings.config.max_code_size)
                .map(|()| code)
        }))
    };
    let baseline_code = screen(baseline)?;
    let candidate_code = screen(candidate)?;

    let (baseline_code, candidate_code) = match (baseline_code, candidate_code) {
        (Ok(b), Ok(c)) => (b, c),
        (b, c) => {
            if let Err(rejection) = b {
                report.push_rejection(&baseline_label, &rejection);
            }
            if let Err(rejection) = c {
                report.push_rejection(&candidate_label, &rejection);
            }
            return Ok((render(&report, settings.format)?, Outcome::Rejected));
        }
    };

    let progress = Arc::new(RunProgress::new(
        &[RunRole::Baseline, RunRole::Candidate],
        &settings.config,
    ));
    let benchmarker = build_benchmarker(settings, Arc::clone(&progress))?;
    let comparison = benchmarker.compare(&baseline_code, &candidate_code);
    progress.finish();

    let comparison = comparison?;
    report.push_comparison(&baseline_label, &candidate_label, &comparison);
    Ok((render(&report, settings.format)?, Outcome::Success))
}

fn list_patterns(settings: &Settings) -> anyhow::Result<(String, Outcome)> {
    let catalog: PatternCatalog = settings.catalog.build();
    let kinds = catalog.kinds();

    let output = match settings.format {
        OutputFormat::Json => {
            let entries: Vec<_> = kinds
                .iter()
                .map(|kind| {
                    serde_json::json!({
                        "code": kind.code(),
                        "explanation": kind.explanation(),
                        "extended": kind.is_extended(),
                    })
                })
                .collect();
            format!("{}\n", serde_json::to_string_pretty(&entries)?)
        }
        OutputFormat::Human => {
            let mut out = format!(
                "Pattern catalog: {:?} ({} detectors, {} kinds)\n\n",
                settings.catalog,
                catalog.len(),
                kinds.len()
            );
            for kind in &kinds {
                out.push_str(&format!("  {:<34} {}\n", kind.code(), kind.explanation()));
            }
            out
        }
    };
    Ok((output, Outcome::Success))
}

fn render(report: &Report, format: OutputFormat) -> anyhow::Result<String> {
    Ok(match format {
        OutputFormat::Json => generate_json_report(report)?,
        OutputFormat::Human => format_human_output(report),
    })
}

fn engine_label(settings: &Settings) -> Option<String> {
    Some(settings.interpreter.clone())
}

fn build_benchmarker(
    settings: &Settings,
    progress: Arc<RunProgress>,
) -> anyhow::Result<Benchmarker> {
    let provider = context_provider(settings)?;
    let benchmarker = Benchmarker::with_provider(
        settings.config.clone(),
        settings.security.clone(),
        provider,
    )?
    .with_catalog(Arc::new(settings.catalog.build()))
    .with_observer(move |event| progress.observe(event));
    Ok(benchmarker)
}

#[cfg(unix)]
fn context_provider(settings: &Settings) -> anyhow::Result<Arc<dyn ContextProvider>> {
    Ok(Arc::new(
        sandbench_core::ProcessProvider::new().with_interpreter(&settings.interpreter),
    ))
}

#[cfg(not(unix))]
fn context_provider(_settings: &Settings) -> anyhow::Result<Arc<dyn ContextProvider>> {
    anyhow::bail!("worker processes are only supported on unix hosts")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("sandbench").chain(args.iter().copied())).unwrap()
    }

    fn settings(args: &[&str]) -> Settings {
        Settings::resolve(&parse(args), &SandbenchConfig::default()).unwrap()
    }

    fn snippet(dir: &tempfile::TempDir, name: &str, body: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_parse_subcommands() {
        assert_eq!(
            parse(&["run", "a.js"]).command,
            Commands::Run {
                file: PathBuf::from("a.js")
            }
        );
        assert_eq!(
            parse(&["compare", "a.js", "b.js"]).command,
            Commands::Compare {
                baseline: PathBuf::from("a.js"),
                candidate: PathBuf::from("b.js"),
            }
        );
        assert_eq!(parse(&["patterns"]).command, Commands::Patterns);
        assert!(Cli::try_parse_from(["sandbench"]).is_err());
    }

    #[test]
    fn test_flag_overrides() {
        let s = settings(&[
            "run",
            "a.js",
            "--warmup",
            "0",
            "--min-samples",
            "2",
            "--max-samples",
            "4",
            "--budget",
            "750ms",
            "--timeout",
            "1s",
            "--isolated=false",
            "--catalog",
            "standard",
            "--format",
            "json",
        ]);
        assert_eq!(s.config.warmup_iterations, 0);
        assert_eq!(s.config.min_samples, 2);
        assert_eq!(s.config.max_samples, 4);
        assert_eq!(s.config.max_time_budget, Duration::from_millis(750));
        assert_eq!(s.config.execution_timeout, Duration::from_secs(1));
        assert!(!s.config.use_isolated_context);
        assert_eq!(s.catalog, CatalogChoice::Standard);
        assert_eq!(s.format, OutputFormat::Json);
        assert_eq!(s.interpreter, "node");
    }

    #[test]
    fn test_file_values_survive_without_flags() {
        let file: SandbenchConfig =
            toml::from_str("[runner]\nmax_samples = 9\ninterpreter = \"nodejs\"\n\n[output]\nformat = \"json\"\n")
                .unwrap();
        let s = Settings::resolve(&parse(&["patterns"]), &file).unwrap();
        assert_eq!(s.config.max_samples, 9);
        assert_eq!(s.interpreter, "nodejs");
        assert_eq!(s.format, OutputFormat::Json);
    }

    #[test]
    fn test_invalid_overrides_rejected() {
        let file = SandbenchConfig::default();
        let cli = parse(&["run", "a.js", "--min-samples", "50", "--max-samples", "5"]);
        assert!(Settings::resolve(&cli, &file).is_err());
        let cli = parse(&["run", "a.js", "--budget", "soon"]);
        assert!(Settings::resolve(&cli, &file).is_err());
        let cli = parse(&["run", "a.js", "--format", "csv"]);
        assert!(Settings::resolve(&cli, &file).is_err());
    }

    #[test]
    fn test_validate_safe_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = snippet(&dir, "ok.js", b"const xs = [1, 2, 3].map(x => x * 2);");
        let (output, outcome) = validate_file(&path, &settings(&["patterns"])).unwrap();
        assert_eq!(outcome, Outcome::Success);
        assert!(output.starts_with('✓'));
    }

    #[test]
    fn test_validate_rejects_with_exit_code_two() {
        let dir = tempfile::tempdir().unwrap();
        let path = snippet(&dir, "bad.js", b"let x = 1;\nwhile (true) {}\n");
        let (output, outcome) = validate_file(&path, &settings(&["patterns"])).unwrap();
        assert_eq!(outcome, Outcome::Rejected);
        assert_eq!(outcome.exit_code(), 2);
        assert!(output.contains("INFINITE_WHILE_LOOP"));
        assert!(output.contains("line 2"));
    }

    #[test]
    fn test_validate_json_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = snippet(&dir, "bad.js", b"eval('1')");
        let s = settings(&["patterns", "--format", "json"]);
        let (output, outcome) = validate_file(&path, &s).unwrap();
        assert_eq!(outcome, Outcome::Rejected);
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["valid"], false);
        assert_eq!(value["rejection"]["code"], "EVAL_USAGE");
        assert_eq!(value["rejection"]["line"], 1);
    }

    #[test]
    fn test_validate_non_text_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = snippet(&dir, "blob.bin", &[0xff, 0xfe, 0x00, 0x41]);
        let (output, outcome) = validate_file(&path, &settings(&["patterns"])).unwrap();
        assert_eq!(outcome, Outcome::Rejected);
        assert!(output.contains("INVALID_INPUT"));
    }

    #[test]
    fn test_validate_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.js");
        assert!(validate_file(&path, &settings(&["patterns"])).is_err());
    }

    #[test]
    fn test_catalog_choice_changes_verdict() {
        let dir = tempfile::tempdir().unwrap();
        let path = snippet(&dir, "log.js", b"console.log('hi')");
        let (_, standard) =
            validate_file(&path, &settings(&["patterns", "--catalog", "standard"])).unwrap();
        let (_, extended) =
            validate_file(&path, &settings(&["patterns", "--catalog", "extended"])).unwrap();
        assert_eq!(standard, Outcome::Success);
        assert_eq!(extended, Outcome::Rejected);
    }

    #[test]
    fn test_compare_reports_each_rejection() {
        let dir = tempfile::tempdir().unwrap();
        let a = snippet(&dir, "a.js", b"for (;;) {}");
        let b = snippet(&dir, "b.js", b"const y = 2;");
        let s = settings(&["patterns", "--format", "json"]);
        let (output, outcome) = compare_files(&a, &b, &s).unwrap();
        assert_eq!(outcome, Outcome::Rejected);
        let report: Report = serde_json::from_str(&output).unwrap();
        assert_eq!(report.runs.len(), 1);
        assert_eq!(report.summary.rejected, 1);
        assert!(report.comparison.is_none());
    }

    #[test]
    fn test_run_rejected_file_skips_execution() {
        let dir = tempfile::tempdir().unwrap();
        let path = snippet(&dir, "bad.js", b"while (!false) {}");
        let s = settings(&["patterns", "--interpreter", "/nonexistent/sandbench-node"]);
        let (output, outcome) = run_file(&path, &s).unwrap();
        assert_eq!(outcome, Outcome::Rejected);
        assert!(output.contains("INFINITE_WHILE_LOOP"));
    }

    #[test]
    fn test_patterns_listing() {
        let (human, _) = list_patterns(&settings(&["patterns"])).unwrap();
        assert!(human.contains("INFINITE_FOR_LOOP"));
        assert!(human.contains("CHILD_PROCESS"));

        let (json, _) =
            list_patterns(&settings(&["patterns", "--catalog", "standard", "--format", "json"]))
                .unwrap();
        let entries: Vec<serde_json::Value> = serde_json::from_str(&json).unwrap();
        assert!(!entries.is_empty());
        assert!(entries.iter().all(|e| e["extended"] == false));
    }

    #[test]
    fn test_init_prints_default_config() {
        let (output, outcome) = execute(&Commands::Init, &settings(&["init"])).unwrap();
        assert_eq!(outcome, Outcome::Success);
        assert!(toml::from_str::<SandbenchConfig>(&output).is_ok());
    }

    #[test]
    #[ignore = "requires node on PATH"]
    fn test_run_with_node() {
        let dir = tempfile::tempdir().unwrap();
        let path = snippet(&dir, "sum.js", b"let s = 0; for (let i = 0; i < 1000; i++) { s += i; }");
        let s = settings(&[
            "run",
            "x",
            "--warmup",
            "1",
            "--min-samples",
            "3",
            "--max-samples",
            "3",
            "--format",
            "json",
        ]);
        let (output, outcome) = run_file(&path, &s).unwrap();
        assert_eq!(outcome, Outcome::Success);
        let report: Report = serde_json::from_str(&output).unwrap();
        assert_eq!(report.summary.completed, 1);
    }
}

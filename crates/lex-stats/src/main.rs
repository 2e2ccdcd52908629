//! CLI entry point for the statistical decision engine.

use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use dotenv::dotenv;
use lex_stats::analysis::{
    anova::one_way_anova, clustering::run_kmeans, correlation::correlate, descriptive::describe,
    pca::run_pca, regression::simple_linear_regression, ttest::independent_ttest,
};
use lex_stats::{
    AnalysisOutcome, AnalysisSettings, CleaningConfig, CleaningPolicyExecutor,
    DataQualityInspector, KMeansParams, MissingMethod, Report,
};
use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use serde::Serialize;
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

/// CLI-compatible missing-value method enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliMissingMethod {
    /// Fill numeric columns with the mean, others with the mode
    Mean,
    /// Fill numeric columns with the median, others with the mode
    Median,
    /// Drop rows containing any missing value
    Drop,
}

impl From<CliMissingMethod> for MissingMethod {
    fn from(cli: CliMissingMethod) -> Self {
        match cli {
            CliMissingMethod::Mean => MissingMethod::Mean,
            CliMissingMethod::Median => MissingMethod::Median,
            CliMissingMethod::Drop => MissingMethod::Drop,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    author = "Lex Machina Team",
    version,
    about = "Statistical Decision Engine",
    long_about = "Data quality checks, policy-driven cleaning and automatic test selection.\n\n\
                  EXAMPLES:\n  \
                  # Inspect a dataset\n  \
                  lex-stats -i data.csv inspect\n\n  \
                  # Remove duplicates and fill missing values with the median\n  \
                  lex-stats -i data.csv clean --remove-duplicates --missing median -o clean.csv\n\n  \
                  # Compare two groups\n  \
                  lex-stats -i data.csv ttest --group treatment --value score\n\n  \
                  # Cluster on three columns, JSON output\n  \
                  lex-stats -i data.csv --json kmeans --columns a,b,c -k 3"
)]
struct Args {
    /// Path to the CSV file to analyse
    #[arg(short, long)]
    input: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show errors and final result)
    #[arg(short, long)]
    quiet: bool,

    /// Output JSON to stdout instead of the text report
    ///
    /// Disables all progress logs; only outputs the final JSON document.
    #[arg(long)]
    json: bool,

    /// JSON file with analysis settings (K-means seed, restarts, PCA cap)
    #[arg(long)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Report duplicates, missing values and outliers
    Inspect,

    /// Apply a cleaning policy and optionally write the result
    Clean {
        /// Remove rows that duplicate an earlier row
        #[arg(long)]
        remove_duplicates: bool,

        /// Columns compared for duplicates (comma separated; default all)
        #[arg(long, value_delimiter = ',')]
        subset: Option<Vec<String>>,

        /// How to handle missing values
        #[arg(long, value_enum)]
        missing: Option<CliMissingMethod>,

        /// JSON cleaning config; overrides the flags above
        #[arg(long)]
        config: Option<PathBuf>,

        /// Use the policy suggested by the quality inspection
        #[arg(long, conflicts_with = "config")]
        suggested: bool,

        /// Write the cleaned dataset to this CSV file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Descriptive statistics for every column
    Describe,

    /// Independent samples t-test
    Ttest {
        #[arg(long)]
        group: String,
        #[arg(long)]
        value: String,
    },

    /// One-way ANOVA with Tukey HSD
    Anova {
        #[arg(long)]
        group: String,
        #[arg(long)]
        value: String,
    },

    /// Pearson or Spearman correlation, chosen by normality
    Correlate {
        #[arg(short)]
        x: String,
        #[arg(short)]
        y: String,
    },

    /// Simple linear regression of y on x
    Regress {
        #[arg(short)]
        x: String,
        #[arg(short)]
        y: String,
    },

    /// Principal component analysis
    Pca {
        #[arg(long, value_delimiter = ',', required = true)]
        columns: Vec<String>,

        /// Components to keep (default: up to the settings cap)
        #[arg(short = 'n', long)]
        components: Option<usize>,

        /// Write component scores to this CSV file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// K-means clustering
    Kmeans {
        #[arg(long, value_delimiter = ',', required = true)]
        columns: Vec<String>,

        /// Number of clusters
        #[arg(short)]
        k: usize,

        /// Seed override for K-means++ initialisation
        #[arg(long)]
        seed: Option<u64>,

        /// Write the labeled rows to this CSV file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled to ensure
/// only JSON is written to stdout.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();

    // .env may carry RUST_LOG
    dotenv().ok();
    init_logging(&args.log_level, args.quiet, args.json);

    if !Path::new(&args.input).exists() {
        return Err(anyhow!("Input file not found: {}", args.input));
    }

    let settings = load_settings(args.settings.as_deref())?;

    info!("Loading dataset from: {}", args.input);
    let df = load_csv_with_fallbacks(&args.input)?;
    info!("Dataset loaded successfully: {:?}", df.shape());
    if df.height() == 0 {
        return Err(anyhow!("Dataset '{}' has no rows", args.input));
    }

    match &args.command {
        Command::Inspect => run_inspect(&args, &df),
        Command::Clean {
            remove_duplicates,
            subset,
            missing,
            config,
            suggested,
            output,
        } => {
            let config = if let Some(path) = config {
                read_json::<CleaningConfig>(path)?
            } else if *suggested {
                DataQualityInspector::new().check_quality(&df)?.suggested_config()
            } else {
                let mut builder = CleaningConfig::builder().remove_duplicates(*remove_duplicates);
                if let Some(subset) = subset {
                    builder = builder.duplicate_subset(subset.iter().cloned());
                }
                if let Some(method) = missing {
                    builder = builder.missing((*method).into());
                }
                builder.build()?
            };
            run_clean(&args, &df, &config, output.as_deref())
        }
        Command::Describe => emit(&args, "describe", describe(&df)),
        Command::Ttest { group, value } => {
            emit(&args, "ttest", independent_ttest(&df, group, value))
        }
        Command::Anova { group, value } => emit(&args, "anova", one_way_anova(&df, group, value)),
        Command::Correlate { x, y } => emit(&args, "correlate", correlate(&df, x, y)),
        Command::Regress { x, y } => {
            emit(&args, "regress", simple_linear_regression(&df, x, y))
        }
        Command::Pca {
            columns,
            components,
            output,
        } => {
            let n_components =
                components.unwrap_or_else(|| columns.len().min(settings.max_pca_components));
            let result = run_pca(&df, columns, Some(n_components));
            if let (Ok(result), Some(path)) = (&result, output) {
                write_csv(&mut result.scores.clone(), path)?;
            }
            emit(&args, "pca", result)
        }
        Command::Kmeans {
            columns,
            k,
            seed,
            output,
        } => {
            let mut params = KMeansParams::from_settings(*k, &settings);
            if let Some(seed) = seed {
                params = params.with_seed(*seed);
            }
            let result = run_kmeans(&df, columns, &params);
            if let (Ok(result), Some(path)) = (&result, output) {
                write_csv(&mut result.labeled.clone(), path)?;
            }
            emit(&args, "kmeans", result)
        }
    }
}

/// Print an analysis result as a text report or a JSON envelope.
///
/// User-input errors are printed as a rejected outcome; anything else fails
/// the command.
fn emit<T: Report + Serialize>(
    args: &Args,
    command: &str,
    result: lex_stats::Result<T>,
) -> Result<()> {
    let outcome = AnalysisOutcome::from_result(result).map_err(|e| {
        error!("Analysis failed: {}", e);
        anyhow!("Analysis failed: {}", e)
    })?;

    if args.json {
        let document = json!({
            "command": command,
            "input": args.input,
            "generated_at": Utc::now().to_rfc3339(),
            "outcome": outcome,
        });
        println!("{}", serde_json::to_string_pretty(&document)?);
    } else {
        print!("{}", outcome.report());
    }
    Ok(())
}

fn run_inspect(args: &Args, df: &DataFrame) -> Result<()> {
    let report = DataQualityInspector::new().check_quality(df)?;

    if args.json {
        let document = json!({
            "command": "inspect",
            "input": args.input,
            "generated_at": Utc::now().to_rfc3339(),
            "report": report,
            "suggested_config": report.suggested_config(),
        });
        println!("{}", serde_json::to_string_pretty(&document)?);
    } else {
        print!("{}", report.summary());
    }
    Ok(())
}

fn run_clean(
    args: &Args,
    df: &DataFrame,
    config: &CleaningConfig,
    output: Option<&Path>,
) -> Result<()> {
    debug!("Cleaning config: {:?}", config);
    let (mut cleaned, log) = CleaningPolicyExecutor::new().apply_cleaning(df, config)?;

    if let Some(path) = output {
        write_csv(&mut cleaned, path)?;
    }

    if args.json {
        let document = json!({
            "command": "clean",
            "input": args.input,
            "generated_at": Utc::now().to_rfc3339(),
            "rows_before": df.height(),
            "rows_after": cleaned.height(),
            "log": log,
        });
        println!("{}", serde_json::to_string_pretty(&document)?);
        return Ok(());
    }

    println!(
        "Rows: {} -> {} ({} columns)",
        df.height(),
        cleaned.height(),
        cleaned.width()
    );
    if log.is_empty() {
        println!("No changes were made.");
    } else {
        for message in log.messages() {
            println!("  - {}", message);
        }
    }
    Ok(())
}

fn load_settings(path: Option<&Path>) -> Result<AnalysisSettings> {
    let settings = match path {
        Some(path) => read_json::<AnalysisSettings>(path)?,
        None => AnalysisSettings::default(),
    };
    settings.validate()?;
    Ok(settings)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {}", path.display()))
}

fn write_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    let mut file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    CsvWriter::new(&mut file).include_header(true).finish(df)?;
    info!("Wrote {} rows to {}", df.height(), path.display());
    Ok(())
}

/// Load CSV, retrying on pre-cleaned content when the standard reader fails.
fn load_csv_with_fallbacks(path: &str) -> Result<DataFrame> {
    match CsvReadOptions::default()
        .with_infer_schema_length(Some(100))
        .with_has_header(true)
        .with_parse_options(CsvParseOptions::default().with_quote_char(Some(b'"')))
        .try_into_reader_with_file_path(Some(PathBuf::from(path)))?
        .finish()
    {
        Ok(df) => return Ok(df),
        Err(e) => {
            debug!("Standard loading failed: {}", e);
        }
    }

    let content = std::fs::read_to_string(path).map_err(|e| {
        error!("Could not read file: {}", e);
        e
    })?;
    let cleaned = clean_csv_content(&content);
    CsvReadOptions::default()
        .with_infer_schema_length(Some(100))
        .with_has_header(true)
        .into_reader_with_file_handle(std::io::Cursor::new(cleaned))
        .finish()
        .map_err(|e| e.into())
}

/// Drop blank lines and collapse doubled quotes.
fn clean_csv_content(content: &str) -> String {
    content
        .replace("\"\"", "\"")
        .lines()
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod chart;
mod classifier;
mod config;
mod error;
mod models;
mod pipeline;
mod quadrant;
mod ratios;
mod report;
mod table;

use classifier::{Classifier, HttpClassifier};
use config::{AppConfig, InvalidPolicy};
use models::Role;
use pipeline::AnalysisPipeline;

#[derive(Parser)]
#[command(name = "classroom-interaction")]
#[command(about = "Classroom interaction classification and PNR–IDIR analysis", long_about = None)]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Optional TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute PNR and IDIR per speaker and group speakers by quadrant
    Analyze {
        /// Counts table with Speakers, Lecture, Instruction, Question, Response
        #[arg(long)]
        csv: PathBuf,
        #[arg(long, value_enum)]
        on_invalid: Option<InvalidPolicy>,
        /// Fail on zero denominators instead of producing inf/NaN ratios
        #[arg(long)]
        strict: bool,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
        /// Write the augmented table (pnr, idir, Quadrant) as CSV
        #[arg(long)]
        table: Option<PathBuf>,
        /// Write the scatter plot as SVG
        #[arg(long)]
        chart: Option<PathBuf>,
        /// Write the render-ready scatter dataset as JSON
        #[arg(long)]
        dataset: Option<PathBuf>,
    },
    /// Classify a single utterance
    Predict {
        #[arg(long)]
        text: String,
        /// Speaker role; when given, uses the role-aware model
        #[arg(long)]
        role: Option<Role>,
        #[arg(long, env = "CLASSROOM_MODEL_URL")]
        model_url: Option<String>,
    },
    /// Label every Role/Utterance row of a CSV file
    Classify {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long, default_value = "classified_output.csv")]
        out: PathBuf,
        #[arg(long, env = "CLASSROOM_MODEL_URL")]
        model_url: Option<String>,
    },
    /// Turn a classified utterance CSV into a per-speaker counts table
    Tally {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long, default_value = "counts.csv")]
        out: PathBuf,
    },
}

fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn classifier_from(config: &AppConfig, model_url: Option<String>) -> anyhow::Result<HttpClassifier> {
    let mut settings = config.classifier.clone();
    if model_url.is_some() {
        settings.base_url = model_url;
    }
    HttpClassifier::new(&settings)
        .context("set --model-url, CLASSROOM_MODEL_URL or [classifier] base_url")
}

fn create(path: &Path) -> anyhow::Result<File> {
    File::create(path).with_context(|| format!("failed to create {}", path.display()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let config = AppConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Analyze {
            csv,
            on_invalid,
            strict,
            out,
            table: table_path,
            chart: chart_path,
            dataset: dataset_path,
        } => {
            let mut analysis = config.analysis.clone();
            if let Some(policy) = on_invalid {
                analysis.on_invalid = policy;
            }
            analysis.strict |= strict;

            let input = File::open(&csv)
                .with_context(|| format!("failed to open {}", csv.display()))?;
            let result = AnalysisPipeline::with_config(analysis)
                .run_csv(input)
                .with_context(|| format!("failed to analyse {}", csv.display()))?;

            println!("{}", report::summary_line(&result.summary));
            println!("Speakers per quadrant:");
            for (quadrant, speakers) in &result.groups {
                println!("- {}: {}", quadrant, speakers.join(", "));
            }

            let source = csv.display().to_string();
            std::fs::write(&out, report::build_report(Some(source.as_str()), &result))?;
            println!("Report written to {}.", out.display());

            if let Some(path) = table_path {
                table::write_augmented(create(&path)?, &result)?;
                println!("Augmented table written to {}.", path.display());
            }
            if chart_path.is_some() || dataset_path.is_some() {
                let scatter = chart::ScatterDataset::from_result(&result);
                if let Some(path) = chart_path {
                    std::fs::write(&path, chart::render_svg(&scatter))?;
                    println!("Chart written to {}.", path.display());
                }
                if let Some(path) = dataset_path {
                    serde_json::to_writer_pretty(create(&path)?, &scatter)?;
                    println!("Dataset written to {}.", path.display());
                }
            }
        }
        Commands::Predict {
            text,
            role,
            model_url,
        } => {
            if text.trim().is_empty() {
                bail!("please enter some text");
            }
            let classifier = classifier_from(&config, model_url)?;
            match role {
                Some(role) => {
                    let label = classifier.predict_label(role, &text).await?;
                    println!("Predicted label: {label}");
                }
                None => {
                    let prediction = classifier.classify_text(&text).await?;
                    println!("Predicted class: {}", prediction.label);
                    println!("Confidence score: {:.4}", prediction.confidence);
                }
            }
        }
        Commands::Classify {
            csv,
            out,
            model_url,
        } => {
            let model = classifier_from(&config, model_url)?;
            let input = File::open(&csv)
                .with_context(|| format!("failed to open {}", csv.display()))?;

            // Buffer so a failed run leaves no half-written artifact behind.
            let mut buffer = Vec::new();
            let count = classifier::classify_rows(&model, input, &mut buffer).await?;
            std::fs::write(&out, buffer)?;
            info!(rows = count, out = %out.display(), "classification complete");
            println!("Classified {count} utterances into {}.", out.display());
        }
        Commands::Tally { csv, out } => {
            let input = File::open(&csv)
                .with_context(|| format!("failed to open {}", csv.display()))?;
            let records = classifier::tally(input)?;
            table::write_counts(create(&out)?, &records)?;
            println!("Counted {} speakers into {}.", records.len(), out.display());
        }
    }

    Ok(())
}

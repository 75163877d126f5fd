use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Local;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use ai_client::{CompletionOptions, JsonCompletion, OpenAi};
use feedlens_analytics::{
    run, run_dir, ChartRenderer, Classifier, KeywordClassifier, PngRenderer, VegaLiteRenderer,
};
use feedlens_common::{AppConfig, ChartFormat, ClassifierKind, FileConfig};

#[derive(Parser)]
#[command(name = "feedlens-analyze", about = "Analyze labelled post batches and write an insight report")]
struct Cli {
    /// Path to config TOML file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory of labelled JSON batch files
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Root directory for timestamped run output
    #[arg(long)]
    output_root: Option<PathBuf>,

    /// Classification strategy: remote or local
    #[arg(long)]
    classifier: Option<ClassifierKind>,

    /// Chart file format: png or vega-lite
    #[arg(long)]
    chart_format: Option<ChartFormat>,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let file_config = FileConfig::load_or_default(cli.config.as_deref())?;
    let app_config = AppConfig::from_env();
    let analytics = file_config.analytics;

    let data_dir = cli.data_dir.unwrap_or(analytics.data_dir);
    let output_root = cli.output_root.unwrap_or(analytics.output_root);
    let kind = cli.classifier.unwrap_or(analytics.classifier);
    let renderer: &dyn ChartRenderer = match cli.chart_format.unwrap_or(analytics.chart_format) {
        ChartFormat::Png => &PngRenderer,
        ChartFormat::VegaLite => &VegaLiteRenderer,
    };

    let classifier = match kind {
        ClassifierKind::Local => Classifier::Local(KeywordClassifier),
        ClassifierKind::Remote => {
            let backend = app_config.api_key.as_ref().map(|key| {
                let ai = OpenAi::new(key.clone(), app_config.classifier_model.clone())
                    .with_base_url(app_config.classifier_url.clone())
                    .with_timeout(Duration::from_secs(analytics.request_timeout_secs));
                Arc::new(ai) as Arc<dyn JsonCompletion>
            });
            let options = CompletionOptions {
                max_tokens: analytics.max_tokens,
                temperature: analytics.temperature,
            };
            Classifier::remote_or_local(backend, options)
        }
    };

    let started_at = Local::now().naive_local();
    let output_dir = run_dir(&output_root, started_at);

    let outcome = run(&classifier, renderer, &data_dir, &output_dir, started_at).await?;

    if outcome.report.summary.total_records == 0 {
        tracing::warn!(data_dir = %data_dir.display(), "No records found, report is empty");
    }
    print!("{}", outcome.report);
    match &outcome.report_file {
        Some(file) => println!("Report: {}", file.path().display()),
        None => println!("Report: not written (see logs)"),
    }
    println!("Charts: {}", outcome.charts.len());

    Ok(())
}

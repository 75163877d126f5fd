use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use feedlens_common::config::ScraperConfig;
use feedlens_common::{AppConfig, FileConfig};
use feedlens_scraper::{write_posts, Credentials, FeedSpider, SpiderConfig, WebDriverPage};
use webdriver_client::{ChromeOptions, WebDriverClient};

/// Chromium flags for an unattended, less detectable session.
const CHROME_ARGS: [&str; 4] = [
    "--disable-blink-features=AutomationControlled",
    "--disable-dev-shm-usage",
    "--no-sandbox",
    "--disable-setuid-sandbox",
];

#[derive(Parser)]
#[command(name = "feedlens-scrape", about = "Log in and save the first posts of the home feed")]
struct Cli {
    /// Path to config TOML file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output JSON file
    #[arg(long)]
    output: Option<PathBuf>,

    /// Maximum number of posts to extract
    #[arg(long)]
    max_posts: Option<usize>,

    /// WebDriver endpoint (chromedriver or Browserless)
    #[arg(long)]
    webdriver_url: Option<String>,

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

/// Environment wins over the config file.
fn credentials(app: &AppConfig, scraper: &ScraperConfig) -> Result<Credentials> {
    let username = app
        .twitter_username
        .clone()
        .or_else(|| scraper.username.clone());
    let password = app
        .twitter_password
        .clone()
        .or_else(|| scraper.password.clone());
    match (username, password) {
        (Some(username), Some(password)) => Ok(Credentials { username, password }),
        _ => Err(anyhow!(
            "Credentials not found: set TWITTER_USERNAME and TWITTER_PASSWORD"
        )),
    }
}

fn chrome_options(scraper: &ScraperConfig) -> ChromeOptions {
    ChromeOptions {
        headless: scraper.headless,
        args: CHROME_ARGS.iter().map(|a| a.to_string()).collect(),
        window_size: Some((scraper.window_width, scraper.window_height)),
        user_agent: Some(scraper.user_agent.clone()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let mut scraper = FileConfig::load_or_default(cli.config.as_deref())?.scraper;
    let app = AppConfig::from_env();

    if let Some(max) = cli.max_posts {
        scraper.max_posts = max;
    }
    let output = cli.output.unwrap_or_else(|| scraper.output.clone());
    let webdriver_url = cli.webdriver_url.unwrap_or_else(|| app.webdriver_url.clone());

    let credentials = credentials(&app, &scraper)
        .inspect_err(|e| tracing::error!(error = %e, "Cannot start scrape"))?;

    let client = WebDriverClient::new(
        &webdriver_url,
        app.webdriver_token.as_deref(),
        Duration::from_secs(scraper.timeout_secs),
    )?;
    let session = client
        .new_session(&chrome_options(&scraper))
        .await
        .with_context(|| format!("Failed to open browser session at {webdriver_url}"))?;

    let page = WebDriverPage::new(session);
    let spider = FeedSpider::new(&page, SpiderConfig::from(&scraper));
    let outcome = spider.run(&credentials).await;

    if let Some(failure) = outcome.failure {
        return Err(failure.into());
    }

    match write_posts(&output, &outcome.posts)? {
        Some(path) => println!("Saved {} posts to {}", outcome.posts.len(), path.display()),
        None => println!("No posts scraped"),
    }
    if outcome.skipped > 0 {
        println!("Skipped {} posts that failed to parse", outcome.skipped);
    }
    Ok(())
}

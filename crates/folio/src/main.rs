use anyhow::Context;
use clap::Parser;
use folio_engine::backend::Renderer;
use folio_engine::cli::Prompter;
use folio_engine::config::{ConfigLoader, FolioConfig};
use folio_engine::run::{HarvestReport, RunMode, RunOptions, run};
use folio_h::{HeadlessRenderer, LaunchOptions};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "folio",
    version,
    about = "Scroll a paginated web viewer, collect its page images and bind them into a PDF"
)]
struct Args {
    /// Page to open. Prompted for when omitted.
    url: Option<String>,

    /// Collect page images and build a PDF instead of only scrolling
    #[arg(long)]
    download_images: bool,

    /// Launch browser in visible mode (not headless)
    #[arg(long)]
    visible: bool,

    /// Leave the browser open until Enter is pressed
    #[arg(long)]
    keep_open: bool,

    /// Seconds to wait after each scroll step
    #[arg(long, value_name = "SECS")]
    scroll_delay: Option<f64>,

    /// Maximum concurrent image downloads
    #[arg(long, value_name = "N")]
    workers: Option<usize>,

    /// Configuration file (defaults to ./folio.yaml, then ~/.folio/config.yaml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Print the final report as JSON
    #[arg(long)]
    json: bool,
}

impl Args {
    fn apply(&self, config: &mut FolioConfig) {
        if let Some(secs) = self.scroll_delay {
            config.scroll.scroll_delay_ms = (secs.max(0.0) * 1000.0).round() as u64;
        }
        if let Some(workers) = self.workers {
            config.fetch.max_concurrency = workers.max(1);
        }
        if self.visible {
            config.browser.visible = true;
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Logs go to stderr; stdout carries the report.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    match session(args).await {
        Ok(report) if report.fatal => ExitCode::FAILURE,
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn session(args: Args) -> anyhow::Result<HarvestReport> {
    let mut config = match &args.config {
        Some(path) => ConfigLoader::load_from(path)
            .await
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => ConfigLoader::load_default()
            .await
            .context("Failed to load config")?,
    };
    args.apply(&mut config);

    let mut prompter = Prompter::stdio();
    let (url, download) = match &args.url {
        Some(url) => (url.clone(), args.download_images),
        None => {
            let url = prompter
                .url()
                .await?
                .context("No URL given")?;
            let download = prompter
                .download_images()
                .await?
                .context("No answer given")?;
            (url, download)
        }
    };

    let mode = if download {
        RunMode::Download
    } else {
        RunMode::ScrollOnly
    };
    let mut renderer = HeadlessRenderer::new(LaunchOptions::from(&config.browser));
    let options = RunOptions {
        config,
        mode,
        keep_open: args.keep_open,
    };

    let report = run(&mut renderer, &url, &options).await;

    if args.keep_open && renderer.is_ready().await {
        prompter
            .wait_for_enter("Press Enter to close the browser...")
            .await?;
        if let Err(e) = renderer.close().await {
            tracing::warn!("Failed to close browser: {}", e);
        }
    }

    print_report(&report, args.json)?;
    Ok(report)
}

fn print_report(report: &HarvestReport, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    if let Some(target) = &report.target {
        println!("Scrolled: {}", target);
    }
    if let Some(height) = report.final_height {
        println!("Final height: {}", height);
    }
    if report.discovered_count > 0 {
        println!(
            "Images: {} found, {} downloaded",
            report.discovered_count, report.downloaded_count
        );
    }
    if let Some(dir) = &report.images_dir {
        println!("Images saved to: {}", dir.display());
    }
    if let Some(pdf) = &report.pdf_path {
        println!("PDF created: {} ({} pages)", pdf.display(), report.page_count);
    }
    if let Some(error) = &report.error {
        println!("{}", error);
    }
    Ok(())
}

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use log::{error, info, warn};
use simplelog::{Config, LevelFilter, WriteLogger};

use report_viewer::api::{HttpBackend, ReportsApi, StaticToken};
use report_viewer::panic_handler;
use report_viewer::pdf;
use report_viewer::settings::{self, Settings};
use report_viewer::vitals::{VitalStatus, VitalsOutcome, load_vitals};
use report_viewer::{Canvas, DocumentRecord, OpenOutcome, Viewer, ViewerOptions, ViewerServices};

#[derive(Parser, Debug)]
#[command(name = "report-viewer", version, about = "Headless health report viewer")]
struct Cli {
    /// Bearer token for the reports API
    #[arg(long, env = "REPORT_VIEWER_TOKEN", hide_env_values = true, global = true)]
    token: Option<String>,

    /// Reports API root, overriding the settings file
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Settings file to use instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[arg(long, default_value = "report-viewer.log", global = true)]
    log_file: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Open a report and write the viewer surface to a PNG file
    Render(RenderArgs),
    /// Print the extracted vitals of a report
    Vitals {
        /// Document id
        #[arg(long)]
        id: String,

        /// Print entries as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug)]
struct RenderArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Page to show, 1-based
    #[arg(long, default_value_t = 1)]
    page: usize,

    /// Zoom steps from the initial scale; negative zooms out
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    zoom: i32,

    #[arg(short, long, default_value = "page.png")]
    output: PathBuf,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct SourceArgs {
    /// Fetch the document record from the backend
    #[arg(long)]
    id: Option<String>,

    /// Read the document record from a JSON file
    #[arg(long)]
    record: Option<PathBuf>,

    /// Open a content URL directly
    #[arg(long)]
    url: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    panic_handler::initialize_panic_handler();
    let cli = Cli::parse();
    init_logging(&cli.log_file)?;

    let mut settings = match &cli.config {
        Some(path) => settings::load_settings_from_path(path)?,
        None => settings::load_settings(),
    };
    settings.apply_env();
    if let Some(base_url) = &cli.base_url {
        settings.base_url = base_url.clone();
    }
    log::set_max_level(settings.log_level_filter());
    info!("Starting report-viewer against {}", settings.base_url);

    let backend = Rc::new(HttpBackend::new(
        &settings.base_url,
        settings.timeout(),
        Box::new(StaticToken(cli.token.clone())),
    )?);

    let result = match cli.command {
        Commands::Render(args) => run_render(args, &settings, backend).await,
        Commands::Vitals { id, json } => run_vitals(&id, json, backend.as_ref()).await,
    };

    if let Err(e) = &result {
        error!("Command failed: {e:?}");
    }
    info!("Shutting down report-viewer");
    result
}

/// Start file logging at info; the configured level is applied once settings load
fn init_logging(path: &Path) -> Result<()> {
    WriteLogger::init(
        LevelFilter::Trace,
        Config::default(),
        File::create(path).with_context(|| format!("Failed to create log file {path:?}"))?,
    )?;
    log::set_max_level(LevelFilter::Info);
    Ok(())
}

async fn run_render(args: RenderArgs, settings: &Settings, backend: Rc<HttpBackend>) -> Result<()> {
    let record = resolve_record(&args.source, backend.as_ref()).await?;
    let services = ViewerServices {
        api: backend.clone(),
        fetcher: backend,
        decoder: pdf::default_decoder(),
    };
    let mut viewer = Viewer::with_options(services, Canvas::default(), ViewerOptions::from(settings));

    let outcome = viewer.open(record).await;
    match &outcome {
        OpenOutcome::Shown(kind) => println!("Loaded {}", kind.as_str()),
        OpenOutcome::Placeholder(message) => println!("{message}"),
        OpenOutcome::Failed(message) => println!("PDF Load Failed: {message}"),
        OpenOutcome::Cancelled | OpenOutcome::Closed => println!("Viewer closed before loading"),
    }

    for _ in 1..args.page {
        if !viewer.next_page().await {
            warn!("Cannot go past page {}", viewer.state().current_page);
            break;
        }
    }
    for _ in 0..args.zoom.unsigned_abs() {
        let changed = if args.zoom > 0 {
            viewer.zoom_in().await
        } else {
            viewer.zoom_out().await
        };
        if !changed {
            break;
        }
    }

    if viewer.state().is_pdf() && viewer.has_document() {
        println!(
            "Page {}  Zoom {}%",
            viewer.page_label(),
            viewer.state().zoom.percent()
        );
    }
    if let Some(message) = viewer.render_error() {
        println!("{message}");
    }
    print_vitals(viewer.vitals());

    let canvas = viewer.close();
    canvas
        .save_png(&args.output)
        .with_context(|| format!("Failed to write {:?}", args.output))?;
    println!("Wrote {}", args.output.display());

    if let OpenOutcome::Failed(message) = outcome {
        bail!(message);
    }
    Ok(())
}

async fn run_vitals(id: &str, json: bool, api: &dyn ReportsApi) -> Result<()> {
    let record = fetch_record(id, api).await?;
    let outcome = load_vitals(api, &record).await;
    if json {
        println!("{}", serde_json::to_string_pretty(outcome.entries())?);
    } else {
        print_vitals(&outcome);
    }
    Ok(())
}

async fn resolve_record(source: &SourceArgs, api: &dyn ReportsApi) -> Result<DocumentRecord> {
    if let Some(id) = &source.id {
        return fetch_record(id, api).await;
    }
    if let Some(path) = &source.record {
        let raw = fs::read_to_string(path).with_context(|| format!("Failed to read {path:?}"))?;
        let value: serde_json::Value =
            serde_json::from_str(&raw).with_context(|| format!("Invalid JSON in {path:?}"))?;
        return Ok(DocumentRecord::from_json(&value));
    }
    if let Some(url) = &source.url {
        return Ok(DocumentRecord::new(None, Some(url)));
    }
    bail!("No document source given")
}

async fn fetch_record(id: &str, api: &dyn ReportsApi) -> Result<DocumentRecord> {
    let raw = api
        .document(id)
        .await
        .with_context(|| format!("Failed to load document {id}"))?;
    let mut record = DocumentRecord::from_json(&raw);
    if record.id.is_none() {
        record.id = Some(id.to_string());
    }
    Ok(record)
}

fn print_vitals(outcome: &VitalsOutcome) {
    if let Some(message) = outcome.empty_message() {
        println!("{message}");
        return;
    }
    println!("Extracted parameters:");
    for entry in outcome.entries() {
        let marker = match entry.classification() {
            VitalStatus::High => " [HIGH]",
            VitalStatus::Low => " [LOW]",
            VitalStatus::Normal => "",
        };
        println!(
            "  {:<28} {:<16} {}{marker}",
            entry.display_name,
            entry.formatted_value(),
            entry.reference_range.as_deref().unwrap_or("-"),
        );
    }
}

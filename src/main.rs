use caption_monitor_lib::captions::{active_caption_at, load_captions_or_empty, CaptionTrack};
use caption_monitor_lib::config::{load_config, ClientConfig};
use caption_monitor_lib::export::export_by_extension;
use caption_monitor_lib::flow::{FlowEvent, FlowSettings, UploadFlow};
use caption_monitor_lib::progress::{format_timestamp, summarize, ProgressTracker};
use caption_monitor_lib::{logging, paths, HttpJobClient, PreviewManager};
use clap::{Parser, Subcommand};
use log::{info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Parser)]
#[command(name = "caption-monitor", version, about = "Upload a video for transcription and follow its captions")]
struct Cli {
    /// Config file (defaults to the user config directory).
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Override the API root, e.g. http://localhost:5000/api
    #[arg(long, global = true)]
    base_url: Option<String>,
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Upload a video and follow the job until it finishes.
    Upload {
        file: PathBuf,
        /// Write the finished captions to an .srt or .vtt file.
        #[arg(long)]
        export: Option<PathBuf>,
    },
    /// List videos the backend has already transcribed.
    List,
    /// Fetch a caption set by locator.
    Captions {
        locator: String,
        /// Show the caption active at this playback time (seconds).
        #[arg(long)]
        at: Option<f64>,
        #[arg(long)]
        export: Option<PathBuf>,
    },
}

fn resolve_config(cli: &Cli) -> Result<ClientConfig, String> {
    let path = cli.config.clone().unwrap_or_else(paths::config_path);
    let mut config = load_config(&path)?;
    if let Some(url) = &cli.base_url {
        config.base_url = url.clone();
    }
    Ok(config)
}

async fn upload(config: &ClientConfig, file: PathBuf, export: Option<PathBuf>) -> Result<(), String> {
    let client = Arc::new(HttpJobClient::new(
        &config.base_url,
        Duration::from_secs(config.upload_timeout_secs),
    ));
    let previews = PreviewManager::new(config.preview_dir());
    info!("Preview copies go to {}", previews.dir().display());
    let flow = UploadFlow::new(client.clone(), previews, FlowSettings::from(config));

    let (tx, mut rx) = mpsc::unbounded_channel();
    let printer = tokio::spawn(async move {
        let tracker = ProgressTracker::start();
        let mut track = CaptionTrack::new();
        let mut shown = 0;
        while let Some(event) = rx.recv().await {
            match event {
                FlowEvent::PreviewReady { uri } => info!("Preview available at {}", uri),
                FlowEvent::Monitoring { captions } => track = captions,
                FlowEvent::Snapshot(status) => {
                    println!("{}", tracker.status_line(&status));
                    let fresh = track.with_captions(|captions| captions[shown.min(captions.len())..].to_vec());
                    shown += fresh.len();
                    for caption in fresh {
                        println!(
                            "  [{} - {}] {}",
                            format_timestamp(caption.start),
                            format_timestamp(caption.end),
                            caption.text
                        );
                    }
                }
            }
        }
    });

    let result = flow.run(&file, Some(tx)).await;
    let _ = printer.await;
    let result = result.map_err(|e| e.to_string())?;
    println!("Done: video {} captions {}", result.video, result.subtitles);

    let captions = load_captions_or_empty(client.as_ref(), &result.subtitles).await;
    let summary = captions.with_captions(summarize);
    println!(
        "{} captions covering {}",
        summary.count,
        format_timestamp(summary.covered_until)
    );
    if let Some(path) = export {
        captions.with_captions(|c| export_by_extension(&path, c))?;
        println!("Captions written to {}", path.display());
    }
    Ok(())
}

async fn list(config: &ClientConfig) -> Result<(), String> {
    let client = HttpJobClient::new(&config.base_url, Duration::from_secs(config.upload_timeout_secs));
    let videos = client.list_videos().await.map_err(|e| e.to_string())?;
    if videos.is_empty() {
        println!("No processed videos");
    }
    for video in videos {
        println!("{}\t{}\t{}", video.name, video.video, video.subtitles);
    }
    Ok(())
}

async fn captions(
    config: &ClientConfig,
    locator: &str,
    at: Option<f64>,
    export: Option<PathBuf>,
) -> Result<(), String> {
    let client = HttpJobClient::new(&config.base_url, Duration::from_secs(config.upload_timeout_secs));
    let track = load_captions_or_empty(&client, locator).await;
    track.with_captions(|captions| -> Result<(), String> {
        match at {
            Some(time) => match active_caption_at(time, captions) {
                Some(c) => println!("[{}] {}", c.id, c.text),
                None => println!("No caption at {}", format_timestamp(time)),
            },
            None => {
                for c in captions {
                    println!(
                        "[{} - {}] {}",
                        format_timestamp(c.start),
                        format_timestamp(c.end),
                        c.text
                    );
                }
            }
        }
        if let Some(path) = &export {
            export_by_extension(path, captions)?;
        }
        Ok(())
    })
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let level = if cli.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    if let Err(e) = paths::ensure_directories() {
        eprintln!("Failed to create app directories: {}", e);
    }
    if let Err(e) = logging::init_logger(level) {
        eprintln!("Failed to initialise logging: {}", e);
    }

    let result = match resolve_config(&cli) {
        Ok(config) => match cli.command {
            Command::Upload { file, export } => upload(&config, file, export).await,
            Command::List => list(&config).await,
            Command::Captions { locator, at, export } => captions(&config, &locator, at, export).await,
        },
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        warn!("{}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

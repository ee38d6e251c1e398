use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::info;

use character_album::album::{AlbumStore, HttpAlbumClient, PhotoStatus, SelectedFile, UploadOrchestrator};
use character_album::validation::format_file_size;
use character_album::{config::Config, create_router, utils::init_logger, AppState};

#[derive(Parser)]
#[command(author, version, about = "Character sheet service with a storage-backed photo album", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API (default)
    Serve,
    /// Upload photos into a fresh album through a running server
    Upload {
        #[arg(long, default_value = "http://localhost:3000")]
        server: String,
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logger();

    match Cli::parse().command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve().await,
        Commands::Upload { server, files } => upload(&server, files).await,
    }
}

async fn serve() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    info!("Configuration loaded: {:?}", config.server);

    let state = AppState::new(config.clone()).context("Failed to initialise storage")?;
    let app = create_router(state);

    let ip = config
        .server
        .host
        .parse()
        .with_context(|| format!("Invalid HOST: {}", config.server.host))?;
    let addr = SocketAddr::new(ip, config.server.port);
    info!("Server listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    Ok(())
}

async fn upload(server: &str, paths: Vec<PathBuf>) -> anyhow::Result<()> {
    let config = Config::from_env()?;

    let mut files = Vec::with_capacity(paths.len());
    for path in &paths {
        let data = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let content_type = mime_guess::from_path(path)
            .first()
            .unwrap_or(mime::APPLICATION_OCTET_STREAM);
        files.push(SelectedFile::new(name, content_type.essence_str(), data));
    }

    let client = Arc::new(HttpAlbumClient::new(server)?);
    let orchestrator = UploadOrchestrator::new(
        AlbumStore::default(),
        client.clone(),
        client,
        config.upload.direct_constraints(),
    );

    let mut changes = orchestrator.store().subscribe();
    let watcher = tokio::spawn(async move {
        while changes.changed().await.is_ok() {
            let album = changes.borrow_and_update().clone();
            for photo in album.iter().filter(|p| p.uploading) {
                info!("{}: {}%", photo.file_name, photo.progress);
            }
        }
    });

    let report = orchestrator.select_files(files).await?;
    orchestrator.release_previews();
    watcher.abort();

    for rejection in &report.rejected {
        println!(
            "skipped {}: {}",
            rejection.file_name.as_deref().unwrap_or("selection"),
            rejection.message()
        );
    }
    for photo in orchestrator.album().iter() {
        match photo.status() {
            PhotoStatus::Succeeded => println!(
                "uploaded {} ({}) -> {}",
                photo.file_name,
                format_file_size(photo.file_size),
                photo.key
            ),
            _ => println!("failed   {} ({})", photo.file_name, format_file_size(photo.file_size)),
        }
    }
    println!(
        "{} uploaded, {} failed, album {}/{}",
        report.succeeded(),
        report.failed(),
        orchestrator.store().len(),
        orchestrator.store().capacity()
    );

    Ok(())
}

use anyhow::Context;
use clap::Parser;
use sift::cli::Cli;
use sift::repo::IndexRepository;
use sift::worker::SnapshotWorker;
use std::sync::Arc;
use tokio::sync::watch;

#[tokio::main]
async fn main() {
    sift::tracing::init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> sift::Result<()> {
    cli.validate()?;

    let repo = Arc::new(match &cli.data_dir {
        Some(dir) => IndexRepository::with_data_dir(dir.clone()),
        None => IndexRepository::new(),
    });

    let imported = repo
        .import_snapshots()
        .context("failed to restore snapshots")?;
    if imported > 0 {
        tracing::info!(imported, "Restored indexes from snapshots");
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker = cli.snapshot_interval.map(|interval| {
        tracing::info!(interval = ?interval, "Starting snapshot worker");
        tokio::spawn(SnapshotWorker::new(Arc::clone(&repo), interval).run(shutdown_rx))
    });

    let app = sift::server::router(Arc::clone(&repo));
    let listener = tokio::net::TcpListener::bind((cli.addr.as_str(), cli.port))
        .await
        .with_context(|| format!("failed to bind {}:{}", cli.addr, cli.port))?;
    tracing::info!(addr = %listener.local_addr()?, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
        })
        .await?;

    // The worker runs one final export before it exits; without a worker
    // the shutdown sweep happens here.
    let _ = shutdown_tx.send(true);
    match worker {
        Some(handle) => {
            let _ = handle.await;
        }
        None => {
            if cli.data_dir.is_some() {
                repo.export_dirty().context("final snapshot sweep failed")?;
            }
        }
    }

    Ok(())
}

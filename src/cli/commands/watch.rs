//! Watch command - run the watch loop until Ctrl+C.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;

use crate::config::Settings;
use crate::watcher::WatchLoop;

/// Arguments for the watch command.
pub struct WatchArgs {
    pub dir: Option<PathBuf>,
    pub scan: bool,
}

/// Run the watch command.
pub async fn run(args: WatchArgs, settings: &Settings) -> anyhow::Result<()> {
    // A directory given on the command line is relative to the caller, not the workspace
    let directory = match args.dir {
        Some(dir) => dir,
        None => settings.resolve(&settings.watch.directory),
    };

    std::fs::create_dir_all(&directory)
        .with_context(|| format!("creating watch directory {}", directory.display()))?;

    let processor = Arc::new(super::build_processor(settings)?);
    let watch_loop = WatchLoop::builder()
        .directory(&directory)
        .processor(processor)
        .queue_capacity(settings.watch.queue_capacity)
        .scan_on_start(args.scan || settings.watch.scan_on_start)
        .build()?;

    let shutdown = CancellationToken::new();
    tokio::spawn(cancel_on_signal(tokio::signal::ctrl_c(), shutdown.clone()));

    eprintln!("Watching {} (Ctrl+C to stop)", directory.display());
    let summary = watch_loop.run(shutdown).await?;

    println!(
        "Processed {} file(s): {} inserted, {} duplicate, {} invalid, {} failed",
        summary.files_processed,
        summary.records.inserted,
        summary.records.duplicates,
        summary.records.invalid,
        summary.records.failed
    );
    if summary.files_failed > 0 || summary.files_retained > 0 {
        println!(
            "{} file(s) could not be opened, {} left in place",
            summary.files_failed, summary.files_retained
        );
    }
    Ok(())
}

/// Cancel `token` once `signal` fires. A signal that cannot be installed
/// leaves the token alone.
async fn cancel_on_signal<F>(signal: F, token: CancellationToken)
where
    F: Future<Output = std::io::Result<()>>,
{
    match signal.await {
        Ok(()) => {
            eprintln!("Received shutdown signal");
            token.cancel();
        }
        // Keep watching; the process can still be stopped externally
        Err(e) => tracing::error!("[watcher] cannot listen for ctrl+c: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_signal_cancels_token() {
        let token = CancellationToken::new();
        cancel_on_signal(async { Ok(()) }, token.clone()).await;
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn test_failed_signal_setup_keeps_running() {
        let token = CancellationToken::new();
        cancel_on_signal(
            async { Err(std::io::Error::other("no signal handler")) },
            token.clone(),
        )
        .await;
        assert!(!token.is_cancelled());
    }
}

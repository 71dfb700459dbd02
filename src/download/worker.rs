//! Download workers draining the shared item queue.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::StreamExt;
use indicatif::{MultiProgress, ProgressBar};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::api::{Fetch, MediaBody};
use crate::download::state::RunStats;
use crate::error::{DownloadError, FetchError};
use crate::fs::account_dir;
use crate::media::DownloadItem;
use crate::output::progress::create_download_bar;

/// Minimum file size to show progress bar (20 MB).
const PROGRESS_THRESHOLD: u64 = 20 * 1024 * 1024;

/// Worker pool settings.
#[derive(Debug, Clone)]
pub struct PoolOptions {
    pub workers: usize,
    /// Delete a partially written file when its transfer fails.
    pub remove_partial: bool,
    /// Log every completed download at info level.
    pub show_downloads: bool,
    /// Draw progress bars for large files.
    pub show_progress: bool,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            workers: 3,
            remove_partial: false,
            show_downloads: true,
            show_progress: false,
        }
    }
}

/// Result of handling one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    Downloaded { path: PathBuf, bytes: u64 },
    /// The destination file already existed; nothing was fetched.
    AlreadyPresent(PathBuf),
}

/// Writes single items to `{output_root}/{account}/{filename}`.
///
/// An existing destination means the item is done: this is the only
/// deduplication there is. The file is created exclusively once the media
/// response has arrived, so a failed request leaves nothing on disk.
pub struct Downloader {
    fetcher: Arc<dyn Fetch>,
    output_root: PathBuf,
    options: PoolOptions,
    cancel: CancellationToken,
    progress: Option<MultiProgress>,
}

impl Downloader {
    pub fn new(
        fetcher: Arc<dyn Fetch>,
        output_root: impl Into<PathBuf>,
        options: PoolOptions,
        cancel: CancellationToken,
    ) -> Self {
        let progress = options.show_progress.then(MultiProgress::new);

        Self {
            fetcher,
            output_root: output_root.into(),
            options,
            cancel,
            progress,
        }
    }

    /// Download one item unless its file already exists.
    pub async fn download(&self, item: &DownloadItem) -> Result<DownloadOutcome, DownloadError> {
        let dir = account_dir(&self.output_root, &item.account)?;
        tokio::fs::create_dir_all(&dir).await?;

        let path = dir.join(item.filename()?);

        if tokio::fs::try_exists(&path).await? {
            tracing::debug!("Skipping existing file: {}", path.display());
            return Ok(DownloadOutcome::AlreadyPresent(path));
        }

        let body = tokio::select! {
            body = self.fetcher.open_media(&item.url) => body?,
            _ = self.cancel.cancelled() => return Err(FetchError::Cancelled.into()),
        };

        let file = match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                // Same name claimed by another worker in the meantime.
                tracing::debug!("Skipping existing file: {}", path.display());
                return Ok(DownloadOutcome::AlreadyPresent(path));
            }
            Err(e) => return Err(e.into()),
        };

        let mut written = 0u64;
        match self.transfer(file, body, &mut written).await {
            Ok(()) => {
                if self.options.show_downloads {
                    tracing::info!("Downloaded: {}", path.display());
                } else {
                    tracing::debug!("Downloaded: {}", path.display());
                }
                Ok(DownloadOutcome::Downloaded {
                    path,
                    bytes: written,
                })
            }
            Err(e) => {
                self.discard(&path, written).await;
                Err(e)
            }
        }
    }

    async fn transfer(
        &self,
        mut file: File,
        mut body: MediaBody,
        written: &mut u64,
    ) -> Result<(), DownloadError> {
        let bar = match (&self.progress, body.content_length) {
            (Some(multi), Some(len)) if len > PROGRESS_THRESHOLD => {
                Some(multi.add(create_download_bar(len)))
            }
            _ => None,
        };

        let result = self.copy_chunks(&mut body, &mut file, written, bar.as_ref()).await;
        if let Some(bar) = bar {
            bar.finish_and_clear();
        }
        result?;

        file.flush().await?;

        match body.content_length {
            Some(expected) if *written < expected => Err(DownloadError::Truncated {
                expected,
                written: *written,
            }),
            _ => Ok(()),
        }
    }

    async fn copy_chunks(
        &self,
        body: &mut MediaBody,
        file: &mut File,
        written: &mut u64,
        bar: Option<&ProgressBar>,
    ) -> Result<(), DownloadError> {
        loop {
            let chunk = tokio::select! {
                chunk = body.chunks.next() => chunk,
                _ = self.cancel.cancelled() => return Err(FetchError::Cancelled.into()),
            };
            let Some(chunk) = chunk else {
                return Ok(());
            };

            let chunk = chunk?;
            file.write_all(&chunk).await?;
            *written += chunk.len() as u64;

            if let Some(bar) = bar {
                bar.set_position(*written);
            }
        }
    }

    /// Partial files stay unless `remove_partial` is set. A kept file masks
    /// the item on later runs.
    async fn discard(&self, path: &Path, written: u64) {
        if !self.options.remove_partial {
            tracing::warn!(
                "Keeping partial file ({} bytes): {}",
                written,
                path.display()
            );
            return;
        }

        if let Err(e) = tokio::fs::remove_file(path).await {
            tracing::warn!("Failed to remove {}: {}", path.display(), e);
        }
    }
}

/// Fixed-size pool of workers sharing one bounded queue.
///
/// Workers exit once the queue is closed and drained, or on cancellation.
pub struct DownloadWorkerPool {
    workers: JoinSet<()>,
}

impl DownloadWorkerPool {
    pub fn spawn(
        downloader: Arc<Downloader>,
        queue: mpsc::Receiver<DownloadItem>,
        stats: Arc<RunStats>,
        workers: usize,
    ) -> Self {
        let queue = Arc::new(Mutex::new(queue));
        let mut set = JoinSet::new();

        for id in 0..workers.max(1) {
            let downloader = downloader.clone();
            let queue = queue.clone();
            let stats = stats.clone();
            set.spawn(async move { run_worker(id, downloader, queue, stats).await });
        }

        tracing::debug!("Started {} download worker(s)", workers.max(1));
        Self { workers: set }
    }

    /// Wait for every worker to finish.
    pub async fn join(mut self) {
        while let Some(result) = self.workers.join_next().await {
            if let Err(e) = result {
                tracing::error!("Download worker failed: {}", e);
            }
        }
    }
}

async fn run_worker(
    id: usize,
    downloader: Arc<Downloader>,
    queue: Arc<Mutex<mpsc::Receiver<DownloadItem>>>,
    stats: Arc<RunStats>,
) {
    loop {
        let item = {
            let mut queue = queue.lock().await;
            tokio::select! {
                item = queue.recv() => item,
                _ = downloader.cancel.cancelled() => None,
            }
        };
        let Some(item) = item else {
            break;
        };

        match downloader.download(&item).await {
            Ok(DownloadOutcome::Downloaded { .. }) => stats.record_download(item.kind),
            Ok(DownloadOutcome::AlreadyPresent(_)) => stats.record_already_present(),
            Err(DownloadError::Fetch(FetchError::Cancelled)) => break,
            Err(e) => {
                stats.record_download_failure();
                tracing::warn!(
                    account = %item.account,
                    shortcode = %item.shortcode,
                    "Failed to download {}: {}",
                    item.url,
                    e
                );
            }
        }
    }

    tracing::debug!("Download worker {} finished", id);
}

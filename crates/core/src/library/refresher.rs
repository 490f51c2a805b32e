//! Periodic library rescan.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::service::LibraryService;

/// Background task that rescans the library, optionally queues conversions
/// and saves the catalog on a fixed interval.
///
/// Owned and started by the composition root; nothing starts it implicitly.
pub struct LibraryRefresher {
    service: Arc<LibraryService>,
    interval: Duration,
    running: Arc<AtomicBool>,
    shutdown_tx: broadcast::Sender<()>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl LibraryRefresher {
    pub fn new(service: Arc<LibraryService>, interval: Duration) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            service,
            interval,
            running: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
            handle: Mutex::new(None),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    pub fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Library refresher already running");
            return;
        }

        let service = Arc::clone(&self.service);
        let running = Arc::clone(&self.running);
        let interval = self.interval;
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        let handle = tokio::spawn(async move {
            info!("Refresh loop started");
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("Refresh loop received shutdown signal");
                        break;
                    }
                    _ = tokio::time::sleep(interval) => {
                        if !running.load(Ordering::Relaxed) {
                            break;
                        }
                        Self::refresh_once(&service).await;
                    }
                }
            }
            info!("Refresh loop stopped");
        });

        *self.handle.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
        info!("Library refresher started (every {:?})", self.interval);
    }

    /// Stops the loop and waits for the current pass to finish.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            warn!("Library refresher not running");
            return;
        }

        let _ = self.shutdown_tx.send(());
        let handle = self
            .handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!("Refresh loop ended abnormally: {}", e);
            }
        }
        info!("Library refresher stopped");
    }

    /// One rescan pass.
    pub async fn refresh_once(service: &LibraryService) {
        service.scan().await;
        if service.config().auto_convert {
            service.convert_all_pending();
        }
        if let Err(e) = service.save_catalog().await {
            warn!("Failed to save catalog: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, LibraryConfig};
    use crate::testing::MockConverter;
    use tempfile::TempDir;

    fn service(dir: &TempDir) -> Arc<LibraryService> {
        let mut config = Config::default();
        config.library = LibraryConfig::default().with_roots(vec![dir.path().to_path_buf()]);
        config.library.catalog_path = dir.path().join("catalog.json");
        Arc::new(LibraryService::new(&config, Arc::new(MockConverter::new())))
    }

    #[tokio::test]
    async fn test_refresher_picks_up_new_files() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir);
        let refresher = LibraryRefresher::new(Arc::clone(&service), Duration::from_millis(20));

        refresher.start();
        assert!(refresher.is_running());
        std::fs::write(dir.path().join("movie.mkv"), b"video").unwrap();

        let mut found = false;
        for _ in 0..100 {
            if service.catalog().len() == 1 && dir.path().join("catalog.json").exists() {
                found = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        refresher.stop().await;

        assert!(found);
        assert!(!refresher.is_running());
        service.shutdown().await;
    }

    #[tokio::test]
    async fn test_start_and_stop_are_idempotent() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir);
        let refresher = LibraryRefresher::new(Arc::clone(&service), Duration::from_secs(60));

        refresher.stop().await;
        refresher.start();
        refresher.start();
        refresher.stop().await;
        refresher.stop().await;
        assert!(!refresher.is_running());
        service.shutdown().await;
    }
}

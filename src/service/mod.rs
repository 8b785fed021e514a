use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use log::{error, info};
use tokio::sync::{Mutex, RwLock};
use tokio::time::MissedTickBehavior;

use crate::core::MvfError;
use crate::dashboard::{DashboardState, Dispatcher, Event, ProgressView, Render};
use crate::table::Row;

/// Owns the dashboard state and serializes every transition through the
/// dispatcher. A failed handler leaves the previous state in place.
///
/// Handlers read the hint and parse tables on the blocking pool; readers of
/// the current state never wait for that I/O.
pub struct DashboardService {
    state: RwLock<DashboardState>,
    transition: Mutex<()>,
    dispatcher: Arc<Dispatcher>,
}

impl DashboardService {
    pub fn new(hint_path: impl Into<PathBuf>) -> Self {
        Self::with_dispatcher(hint_path, Dispatcher::default())
    }

    pub fn with_dispatcher(hint_path: impl Into<PathBuf>, dispatcher: Dispatcher) -> Self {
        Self {
            state: RwLock::new(DashboardState::new(hint_path)),
            transition: Mutex::new(()),
            dispatcher: Arc::new(dispatcher),
        }
    }

    pub async fn handle(&self, event: Event) -> Result<Vec<Render>, MvfError> {
        let _transition = self.transition.lock().await;
        let current = self.state.read().await.clone();
        let dispatcher = Arc::clone(&self.dispatcher);

        let (next, renders) =
            tokio::task::spawn_blocking(move || dispatcher.dispatch(&current, &event))
                .await
                .map_err(|e| MvfError::TaskError(format!("event handler: {e}")))??;

        *self.state.write().await = next;
        Ok(renders)
    }

    pub async fn view(&self) -> Option<Arc<ProgressView>> {
        self.state.read().await.view().cloned()
    }

    pub async fn micrograph_count(&self) -> usize {
        self.state.read().await.micrograph_count()
    }

    pub async fn previews_dir(&self) -> Option<PathBuf> {
        self.state.read().await.previews_dir()
    }

    /// Selects a micrograph row, reloading out of band on a miss.
    pub async fn select(&self, index: usize) -> Result<Row, MvfError> {
        let renders = self.handle(Event::Select { index }).await?;
        renders
            .into_iter()
            .find_map(|render| match render {
                Render::Selection { row, .. } => Some(row),
                Render::Progress { .. } => None,
            })
            .ok_or(MvfError::IndexOutOfRange {
                index,
                len: self.micrograph_count().await,
            })
    }

    /// Fires a tick every `interval`, starting immediately with
    /// `n_intervals = 0`. Runs until the task is dropped.
    pub async fn run_poller(self: Arc<Self>, interval: Duration) {
        let mut timer = tokio::time::interval(interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("polling progress hint every {interval:?}");

        let mut n_intervals = 0u64;
        loop {
            timer.tick().await;
            if let Err(e) = self.handle(Event::Tick { n_intervals }).await {
                error!("progress refresh failed: {e}");
            }
            n_intervals += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::{EventKind, EventSource, Transition};
    use crate::progress::{HINT_FILE_NAME, MICROGRAPHS_BLOCK, write_hint};
    use crate::star::{self, Block};
    use crate::table::Table;
    use std::path::Path;
    use tempfile::TempDir;

    fn publish(dir: &Path, n: usize) {
        let rows: Vec<Row> = (0..n)
            .map(|i| {
                [("rlnMicrographName", format!("m{i}.mrc"))]
                    .into_iter()
                    .collect()
            })
            .collect();
        star::write(
            &dir.join("micrographs.star"),
            &[Block::new(MICROGRAPHS_BLOCK, Table::from_rows(rows))],
        )
        .unwrap();
        write_hint(&dir.join(HINT_FILE_NAME), Path::new("micrographs.star"), n).unwrap();
    }

    #[tokio::test]
    async fn test_tick_updates_view() {
        let dir = TempDir::new().unwrap();
        let svc = DashboardService::new(dir.path().join(HINT_FILE_NAME));
        assert!(svc.view().await.is_none());

        publish(dir.path(), 3);
        let renders = svc.handle(Event::Tick { n_intervals: 0 }).await.unwrap();
        assert_eq!(renders.len(), 1);
        assert_eq!(svc.micrograph_count().await, 3);
        assert_eq!(svc.previews_dir().await, Some(dir.path().join("Previews")));
    }

    #[tokio::test]
    async fn test_failed_handler_keeps_state() {
        let dir = TempDir::new().unwrap();
        let svc = DashboardService::new(dir.path().join(HINT_FILE_NAME));
        publish(dir.path(), 2);
        svc.handle(Event::Tick { n_intervals: 0 }).await.unwrap();

        std::fs::write(dir.path().join(HINT_FILE_NAME), "garbage\n").unwrap();
        assert!(svc.handle(Event::Tick { n_intervals: 1 }).await.is_err());
        assert_eq!(svc.view().await.unwrap().generation, 1);
        assert_eq!(svc.micrograph_count().await, 2);
    }

    #[tokio::test]
    async fn test_select() {
        let dir = TempDir::new().unwrap();
        let svc = DashboardService::new(dir.path().join(HINT_FILE_NAME));
        publish(dir.path(), 2);

        let row = svc.select(1).await.unwrap();
        assert_eq!(
            row.get("rlnMicrographName").and_then(|v| v.as_text()),
            Some("m1.mrc")
        );
        assert_eq!(
            svc.select(7).await.unwrap_err(),
            MvfError::IndexOutOfRange { index: 7, len: 2 }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_poller_picks_up_changes() {
        let dir = TempDir::new().unwrap();
        let svc = Arc::new(DashboardService::new(dir.path().join(HINT_FILE_NAME)));
        publish(dir.path(), 1);

        let poller = tokio::spawn(Arc::clone(&svc).run_poller(Duration::from_secs(10)));
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(svc.micrograph_count().await, 1);

        publish(dir.path(), 4);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(svc.micrograph_count().await, 4);
        poller.abort();
    }

    fn slow_tick(state: &DashboardState, _event: &Event) -> Result<Transition, MvfError> {
        std::thread::sleep(Duration::from_millis(300));
        Ok((state.clone(), Vec::new()))
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_reads_do_not_wait_for_reload() {
        let dir = TempDir::new().unwrap();
        let mut dispatcher = Dispatcher::empty();
        dispatcher.register(EventSource::IntervalTimer, EventKind::Tick, slow_tick);
        let svc = Arc::new(DashboardService::with_dispatcher(
            dir.path().join(HINT_FILE_NAME),
            dispatcher,
        ));

        let ticking = Arc::clone(&svc);
        let tick =
            tokio::spawn(async move { ticking.handle(Event::Tick { n_intervals: 0 }).await });
        tokio::time::sleep(Duration::from_millis(50)).await;

        let count = tokio::time::timeout(Duration::from_millis(100), svc.micrograph_count()).await;
        assert_eq!(count.ok(), Some(0));
        tick.await.unwrap().unwrap();
    }
}

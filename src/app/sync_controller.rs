//! Keeps the catalog loaded and recovers from failed loads.
//!
//! A single driver task owns the state machine:
//!
//! ```text
//! Loading ──ok──▶ Ready ──reload──▶ Loading
//!    │                                 ▲
//!   err                             reload
//!    ▼                                 │
//! Degraded(n) ──timer | restored──▶ attempt ──err──▶ Degraded(n+1)
//!                                      └──ok──▶ Ready
//! ```
//!
//! Because every load runs on the driver, attempts never overlap: triggers
//! that fire while a load is in flight are picked up once it settles, and a
//! burst of them counts as one. The connectivity signal is subscribed for the
//! whole time the controller is not `Ready`.
//! Readers go through [`SyncHandle`], which only sees whole published values.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::app::bulk_loader::BulkLoader;
use crate::app::connectivity::ConnectivityHub;
use crate::app::filter::FilterEngine;
use crate::config::SyncConfig;
use crate::domain::{Catalog, CatalogRecord, FilterCriteria, SyncState};
use crate::error::{Result, SyncError};
use crate::observability::metrics;

#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub retry_interval: Duration,
    /// Stop automatic retries after this many failed attempts; `None` never stops
    pub max_attempts: Option<u32>,
}

impl Default for SyncOptions {
    fn default() -> Self {
        SyncOptions::from(&SyncConfig::default())
    }
}

impl From<&SyncConfig> for SyncOptions {
    fn from(config: &SyncConfig) -> Self {
        Self {
            retry_interval: config.retry_interval(),
            max_attempts: config.max_attempts,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryTrigger {
    Timer,
    ConnectivityRestored,
}

impl RetryTrigger {
    fn label(&self) -> &'static str {
        match self {
            RetryTrigger::Timer => "timer",
            RetryTrigger::ConnectivityRestored => "connectivity",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Reload,
    Shutdown,
}

struct Shared {
    state: watch::Sender<SyncState>,
    catalog: watch::Sender<Arc<Catalog>>,
    criteria: watch::Sender<FilterCriteria>,
}

/// Cheap, cloneable read/command access to a running controller.
#[derive(Clone)]
pub struct SyncHandle {
    shared: Arc<Shared>,
    commands: mpsc::UnboundedSender<Command>,
}

impl SyncHandle {
    pub fn sync_state(&self) -> SyncState {
        self.shared.state.borrow().clone()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<SyncState> {
        self.shared.state.subscribe()
    }

    /// Latest published catalog. Empty until the first successful load.
    pub fn catalog(&self) -> Arc<Catalog> {
        self.shared.catalog.borrow().clone()
    }

    pub fn subscribe_catalog(&self) -> watch::Receiver<Arc<Catalog>> {
        self.shared.catalog.subscribe()
    }

    pub fn category_catalog(&self) -> BTreeSet<String> {
        self.catalog().categories().clone()
    }

    pub fn criteria(&self) -> FilterCriteria {
        self.shared.criteria.borrow().clone()
    }

    /// Replace the criteria. No network activity; the next read re-evaluates.
    pub fn set_criteria(&self, criteria: FilterCriteria) {
        self.shared.criteria.send_replace(criteria);
    }

    pub fn update_criteria(&self, edit: impl FnOnce(&mut FilterCriteria)) {
        self.shared.criteria.send_modify(edit);
    }

    /// Current catalog filtered by the current criteria, in catalog order.
    pub fn filtered(&self) -> Vec<CatalogRecord> {
        let catalog = self.catalog();
        let criteria = self.criteria();
        FilterEngine::evaluate(catalog.records(), &criteria)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Ask for a fresh load. Requests made while one is pending coalesce.
    pub fn request_reload(&self) -> Result<()> {
        self.commands
            .send(Command::Reload)
            .map_err(|_| SyncError::ControllerClosed)
    }
}

/// Owner of the driver task. Dropping it aborts the driver; prefer
/// [`SyncController::shutdown`], which lets an in-flight load finish.
pub struct SyncController {
    handle: SyncHandle,
    task: Option<JoinHandle<()>>,
}

impl SyncController {
    /// Spawn the driver and start the first load. Requires a tokio runtime.
    pub fn start(loader: BulkLoader, hub: ConnectivityHub, options: SyncOptions) -> Self {
        let (state, _) = watch::channel(SyncState::Loading);
        let (catalog, _) = watch::channel(Arc::new(Catalog::empty()));
        let (criteria, _) = watch::channel(FilterCriteria::default());
        let shared = Arc::new(Shared {
            state,
            catalog,
            criteria,
        });
        let (commands, rx) = mpsc::unbounded_channel();

        let driver = SyncDriver {
            shared: Arc::clone(&shared),
            loader,
            hub,
            options,
            commands: rx,
        };
        let task = tokio::spawn(driver.run());

        Self {
            handle: SyncHandle { shared, commands },
            task: Some(task),
        }
    }

    pub fn handle(&self) -> SyncHandle {
        self.handle.clone()
    }

    /// Stop the driver after any in-flight load settles.
    pub async fn shutdown(mut self) {
        let _ = self.handle.commands.send(Command::Shutdown);
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("Sync driver ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for SyncController {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Retry triggers for one not-ready session. Entering the scope subscribes
/// to the connectivity signal, so a restore that lands during `Loading` is
/// kept for the next wake-up. The timer is armed on the first failure and
/// restarted after every later one. Dropping the scope releases both.
struct RetryScope {
    ticker: Option<Interval>,
    restored: Option<broadcast::Receiver<()>>,
}

impl RetryScope {
    fn enter(hub: &ConnectivityHub) -> Self {
        Self {
            ticker: None,
            restored: Some(hub.subscribe()),
        }
    }

    /// Start the retry period over from now.
    fn arm_timer(&mut self, period: Duration) {
        match self.ticker.as_mut() {
            Some(ticker) => ticker.reset(),
            None => {
                let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                debug!("Retry timer armed (every {:?})", period);
                self.ticker = Some(ticker);
            }
        }
    }

    async fn next_trigger(&mut self) -> RetryTrigger {
        let Self { ticker, restored } = self;
        tokio::select! {
            _ = wait_tick(ticker) => RetryTrigger::Timer,
            _ = wait_restored(restored) => RetryTrigger::ConnectivityRestored,
        }
    }
}

impl Drop for RetryScope {
    fn drop(&mut self) {
        debug!("Retry triggers released");
    }
}

async fn wait_tick(ticker: &mut Option<Interval>) {
    match ticker.as_mut() {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}

/// Resolves once per burst: signals queued behind the first are consumed too.
async fn wait_restored(rx: &mut Option<broadcast::Receiver<()>>) {
    loop {
        let Some(receiver) = rx.as_mut() else {
            return std::future::pending().await;
        };
        match receiver.recv().await {
            Ok(()) | Err(RecvError::Lagged(_)) => {
                while let Ok(()) | Err(TryRecvError::Lagged(_)) = receiver.try_recv() {}
                return;
            }
            // hub gone: the timer keeps working on its own
            Err(RecvError::Closed) => *rx = None,
        }
    }
}

enum Wake {
    Retry(RetryTrigger),
    Command(Option<Command>),
}

struct SyncDriver {
    shared: Arc<Shared>,
    loader: BulkLoader,
    hub: ConnectivityHub,
    options: SyncOptions,
    commands: mpsc::UnboundedReceiver<Command>,
}

impl SyncDriver {
    async fn run(mut self) {
        info!("Sync driver started");
        'session: loop {
            // Subscribe before publishing so no signal is missed
            let mut retry = Some(RetryScope::enter(&self.hub));
            self.publish_state(SyncState::Loading);
            let mut attempt: u32 = 0;

            loop {
                match self.loader.load().await {
                    Ok(catalog) => {
                        drop(retry.take());
                        self.shared.catalog.send_replace(Arc::new(catalog));
                        self.publish_state(SyncState::Ready);
                        break;
                    }
                    Err(e) => {
                        attempt += 1;
                        let exhausted = self
                            .options
                            .max_attempts
                            .is_some_and(|max| attempt >= max);
                        if exhausted {
                            retry = None;
                            warn!(
                                "Stopping automatic retries after {} failed attempts",
                                attempt
                            );
                        } else if let Some(scope) = retry.as_mut() {
                            scope.arm_timer(self.options.retry_interval);
                        }
                        self.publish_state(SyncState::Degraded {
                            attempt,
                            last_error: e.to_string(),
                        });
                    }
                }

                let wake = match retry.as_mut() {
                    Some(scope) => tokio::select! {
                        trigger = scope.next_trigger() => Wake::Retry(trigger),
                        command = self.commands.recv() => Wake::Command(command),
                    },
                    None => Wake::Command(self.commands.recv().await),
                };

                match wake {
                    Wake::Retry(trigger) => {
                        metrics::sync::retry(trigger.label());
                        info!("Retrying load (attempt {}, trigger {:?})", attempt + 1, trigger);
                    }
                    Wake::Command(command) => match self.coalesce(command) {
                        Command::Reload => {
                            info!("Manual reload requested while degraded");
                            continue 'session;
                        }
                        Command::Shutdown => break 'session,
                    },
                }
            }

            let command = self.commands.recv().await;
            match self.coalesce(command) {
                Command::Reload => info!("Manual reload requested"),
                Command::Shutdown => break 'session,
            }
        }
        info!("Sync driver stopped");
    }

    /// Fold queued commands into one. Any shutdown wins; duplicate reloads
    /// collapse. A closed channel means every handle is gone.
    fn coalesce(&mut self, first: Option<Command>) -> Command {
        let mut command = first.unwrap_or(Command::Shutdown);
        while let Ok(next) = self.commands.try_recv() {
            if next == Command::Shutdown {
                command = Command::Shutdown;
            }
        }
        command
    }

    fn publish_state(&self, state: SyncState) {
        metrics::sync::state(&state);
        info!("Sync state: {}", state);
        self.shared.state.send_replace(state);
    }
}

//! Background detection of newer remote versions.
//!
//! A [`ConflictWatcher`] polls the version of one snapshot and raises a
//! non-destructive "newer version available" state. It never reloads or
//! overwrites anything by itself.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::store::VersionedStore;

/// Poll period used when none is configured.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Shortest accepted poll period.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Snapshot whose version is being watched.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum WatchTarget {
    Save(String),
    GlobalLatest,
}

impl fmt::Display for WatchTarget {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Save(save_id) => write!(formatter, "save {save_id}"),
            Self::GlobalLatest => formatter.write_str("global latest"),
        }
    }
}

/// Notification state exposed to the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ConflictState {
    #[default]
    Quiet,
    /// A newer remote version exists
    Notifying(u64),
}

impl ConflictState {
    /// Next state after a successful version query.
    ///
    /// Pending local edits suppress the transition into `Notifying` so a
    /// reload prompt never competes with work in progress.
    #[must_use]
    pub fn observe(self, remote_version: u64, baseline: u64, has_unsaved_changes: bool) -> Self {
        if has_unsaved_changes || remote_version <= baseline {
            return self;
        }
        match self {
            Self::Notifying(current) if current >= remote_version => self,
            _ => Self::Notifying(remote_version),
        }
    }

    pub const fn newer_version(self) -> Option<u64> {
        match self {
            Self::Quiet => None,
            Self::Notifying(version) => Some(version),
        }
    }

    pub const fn is_notifying(self) -> bool {
        matches!(self, Self::Notifying(_))
    }
}

/// Everything that identifies one polling session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchOptions {
    pub target: Option<WatchTarget>,
    /// Last version loaded or saved by this client
    pub current_version: Option<u64>,
    /// False until the initial load has completed
    pub enabled: bool,
    pub interval: Duration,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            target: None,
            current_version: None,
            enabled: false,
            interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl WatchOptions {
    pub fn new(target: WatchTarget, current_version: u64) -> Self {
        Self {
            target: Some(target),
            current_version: Some(current_version),
            enabled: true,
            interval: DEFAULT_POLL_INTERVAL,
        }
    }

    #[must_use]
    pub const fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    const fn should_poll(&self) -> bool {
        self.enabled && self.target.is_some() && self.current_version.is_some()
    }
}

#[derive(Debug)]
struct WatchShared {
    state: watch::Sender<ConflictState>,
    unsaved: AtomicBool,
    /// Highest version the user dismissed for the current target
    acknowledged: AtomicU64,
    generation: AtomicU64,
}

impl WatchShared {
    fn set_state(&self, next: ConflictState) {
        self.state.send_if_modified(|state| {
            if *state == next {
                false
            } else {
                *state = next;
                true
            }
        });
    }
}

/// Owns at most one polling task for the configured target.
pub struct ConflictWatcher<S> {
    store: Arc<S>,
    shared: Arc<WatchShared>,
    options: WatchOptions,
    task: Option<JoinHandle<()>>,
}

impl<S> fmt::Debug for ConflictWatcher<S> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ConflictWatcher")
            .field("options", &self.options)
            .field("state", &*self.shared.state.borrow())
            .field("running", &self.task.is_some())
            .finish_non_exhaustive()
    }
}

impl<S: VersionedStore> ConflictWatcher<S> {
    pub fn new(store: Arc<S>) -> Self {
        let (state, _) = watch::channel(ConflictState::Quiet);
        Self {
            store,
            shared: Arc::new(WatchShared {
                state,
                unsaved: AtomicBool::new(false),
                acknowledged: AtomicU64::new(0),
                generation: AtomicU64::new(0),
            }),
            options: WatchOptions::default(),
            task: None,
        }
    }

    /// Apply new options, restarting the poll only when they differ.
    ///
    /// Must be called from within a tokio runtime for polling to start.
    pub fn configure(&mut self, options: WatchOptions) {
        if options == self.options {
            return;
        }

        self.stop();
        if options.target != self.options.target {
            self.shared.acknowledged.store(0, Ordering::Release);
            self.shared.set_state(ConflictState::Quiet);
        } else if !options.enabled {
            self.shared.set_state(ConflictState::Quiet);
        } else if let (ConflictState::Notifying(newer), Some(baseline)) =
            (self.state(), options.current_version)
        {
            if newer <= baseline {
                self.shared.set_state(ConflictState::Quiet);
            }
        }
        self.options = options;

        if self.options.should_poll() {
            self.start();
        }
    }

    /// Report whether the caller holds unsaved local edits.
    pub fn set_unsaved_changes(&self, has_unsaved_changes: bool) {
        self.shared
            .unsaved
            .store(has_unsaved_changes, Ordering::Release);
    }

    /// Hide the current notification until an even newer version appears.
    pub fn dismiss(&self) {
        if let ConflictState::Notifying(version) = self.state() {
            self.shared.acknowledged.fetch_max(version, Ordering::AcqRel);
        }
        self.shared.set_state(ConflictState::Quiet);
    }

    /// Adopt `version` as the new baseline after the caller reloaded.
    pub fn rebase(&mut self, version: u64) {
        let options = WatchOptions {
            current_version: Some(version),
            ..self.options.clone()
        };
        self.shared.set_state(ConflictState::Quiet);
        self.configure(options);
    }

    /// Stop polling and clear any notification.
    pub fn disable(&mut self) {
        let options = WatchOptions {
            enabled: false,
            ..self.options.clone()
        };
        self.configure(options);
        self.stop();
        self.shared.set_state(ConflictState::Quiet);
    }

    pub fn state(&self) -> ConflictState {
        *self.shared.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConflictState> {
        self.shared.state.subscribe()
    }

    pub fn options(&self) -> &WatchOptions {
        &self.options
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    fn start(&mut self) {
        let (Some(target), Some(baseline)) =
            (self.options.target.clone(), self.options.current_version)
        else {
            return;
        };
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(error) => {
                tracing::warn!("Cannot watch {} without an async runtime: {}", target, error);
                return;
            }
        };

        let generation = self.shared.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let poll = VersionPoll {
            store: Arc::clone(&self.store),
            shared: Arc::clone(&self.shared),
            target,
            baseline,
            interval: self.options.interval.max(MIN_POLL_INTERVAL),
            generation,
        };
        tracing::debug!(
            "Watching {} from version {} every {:?}",
            poll.target,
            poll.baseline,
            poll.interval
        );
        self.task = Some(runtime.spawn(poll.run()));
    }

    fn stop(&mut self) {
        self.shared.generation.fetch_add(1, Ordering::AcqRel);
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl<S> Drop for ConflictWatcher<S> {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

struct VersionPoll<S> {
    store: Arc<S>,
    shared: Arc<WatchShared>,
    target: WatchTarget,
    baseline: u64,
    interval: Duration,
    generation: u64,
}

impl<S: VersionedStore> VersionPoll<S> {
    async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let result = match &self.target {
                WatchTarget::Save(save_id) => self.store.fetch_version(save_id).await,
                WatchTarget::GlobalLatest => self.store.fetch_global_latest_version().await,
            };

            match result {
                Ok(remote_version) => {
                    self.publish(remote_version);
                }
                Err(error) => {
                    tracing::warn!("Failed to check version of {}: {}", self.target, error);
                }
            }
        }
    }

    /// The generation is checked while the state lock is held, so a
    /// concurrent `configure` or `disable` can never be overwritten by this
    /// stale poll.
    fn publish(&self, remote_version: u64) -> bool {
        let baseline = self
            .baseline
            .max(self.shared.acknowledged.load(Ordering::Acquire));
        let has_unsaved_changes = self.shared.unsaved.load(Ordering::Acquire);

        self.shared.state.send_if_modified(|state| {
            if self.shared.generation.load(Ordering::Acquire) != self.generation {
                return false;
            }
            let next = state.observe(remote_version, baseline, has_unsaved_changes);
            if next == *state {
                return false;
            }
            if next.is_notifying() {
                tracing::info!(
                    "Newer version {} of {} is available",
                    remote_version,
                    self.target
                );
            }
            *state = next;
            true
        })
    }
}

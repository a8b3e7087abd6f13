//! The single writer over the incentive state.
//!
//! Every command runs in two phases:
//!
//! 1. Under the engine lock: apply the transition, encode the records it
//!    touched, enqueue them for the writer task and publish a snapshot.
//!    The caller gets its events back as soon as this returns.
//! 2. On the writer task: apply queued writes to the store one at a time,
//!    in enqueue order, retrying failures a bounded number of times.
//!
//! Enqueueing while the lock is held is what keeps storage order identical to
//! mutation order. A write that keeps failing is logged and dropped; memory
//! stays authoritative for the session and the last successful write is what
//! the next process start sees.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, SubsecRound, Utc};
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, info, warn};

use super::engine::{IncentiveEngine, IncentiveSnapshot, Transition};
use super::records::{IncentiveSettings, TokenAccount, BALANCE_KEY, SETTINGS_KEY};
use crate::clock::Clock;
use crate::error::{Result, SpendError};
use crate::events::Event;
use crate::storage::{KeyValueStore, PersistenceConfig};

enum WriteRequest {
    Put { key: &'static str, value: String },
    Flush(oneshot::Sender<()>),
}

pub struct IncentiveService {
    engine: Mutex<IncentiveEngine>,
    clock: Arc<dyn Clock>,
    writes: mpsc::UnboundedSender<WriteRequest>,
    snapshots: watch::Sender<IncentiveSnapshot>,
}

impl IncentiveService {
    /// Load both records from `store` and start the writer task.
    ///
    /// Never fails: a missing, unreadable or undecodable record is replaced by
    /// its defaults, independently of the other record.
    pub async fn load(
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        persistence: PersistenceConfig,
    ) -> Self {
        let account: TokenAccount =
            load_record(store.as_ref(), BALANCE_KEY, TokenAccount::decode).await;
        let settings: IncentiveSettings =
            load_record(store.as_ref(), SETTINGS_KEY, IncentiveSettings::decode).await;

        let engine = IncentiveEngine::new(account, settings, persisted_now(clock.as_ref()));
        info!(
            balance = engine.balance(),
            browsing_minutes = engine.settings().browsing_minutes,
            ad_eligible = engine.is_ad_eligible(),
            "incentive state loaded"
        );

        let (writes, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_writer(store, rx, persistence));
        let (snapshots, _) = watch::channel(engine.snapshot());

        Self {
            engine: Mutex::new(engine),
            clock,
            writes,
            snapshots,
        }
    }

    // ── Reads ────────────────────────────────────────────────────────

    pub fn balance(&self) -> u64 {
        self.lock().balance()
    }

    pub fn tokens_enabled(&self) -> bool {
        self.lock().settings().tokens_enabled
    }

    pub fn ad_blocking_enabled(&self) -> bool {
        self.lock().settings().ad_blocking_enabled
    }

    pub fn is_ad_eligible(&self) -> bool {
        self.lock().is_ad_eligible()
    }

    pub fn snapshot(&self) -> IncentiveSnapshot {
        self.lock().snapshot()
    }

    /// Receiver that always holds the latest committed snapshot.
    pub fn subscribe(&self) -> watch::Receiver<IncentiveSnapshot> {
        self.snapshots.subscribe()
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn record_activity(&self) -> Vec<Event> {
        self.apply(|engine, now| engine.record_activity(now))
    }

    /// Re-check eligibility now. Returns whether an ad may be shown.
    pub fn request_ad(&self) -> bool {
        let mut engine = self.lock();
        let transition = engine.request_ad(self.now());
        self.commit(&engine, &transition);
        engine.is_ad_eligible()
    }

    pub fn earn(&self) -> Vec<Event> {
        self.apply(|engine, now| engine.earn(now))
    }

    pub fn dismiss(&self) -> Vec<Event> {
        self.apply(|engine, now| engine.dismiss(now))
    }

    pub fn spend(&self, amount: u64) -> Result<Vec<Event>, SpendError> {
        let mut engine = self.lock();
        match engine.spend(amount, self.now()) {
            Ok(transition) => {
                self.commit(&engine, &transition);
                Ok(transition.events)
            }
            Err(e) => {
                debug!(amount, error = %e, "spend rejected");
                Err(e)
            }
        }
    }

    pub fn reset(&self) -> Vec<Event> {
        self.apply(|engine, now| engine.reset(now))
    }

    pub fn set_tokens_enabled(&self, enabled: bool) -> Vec<Event> {
        self.apply(|engine, now| engine.set_tokens_enabled(enabled, now))
    }

    pub fn set_ad_blocking_enabled(&self, enabled: bool) -> Vec<Event> {
        self.apply(|engine, now| engine.set_ad_blocking_enabled(enabled, now))
    }

    /// Wait until every write enqueued before this call has been attempted.
    pub async fn flush(&self) {
        let (done, wait) = oneshot::channel();
        if self.writes.send(WriteRequest::Flush(done)).is_ok() {
            let _ = wait.await;
        }
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn now(&self) -> DateTime<Utc> {
        persisted_now(self.clock.as_ref())
    }

    fn lock(&self) -> MutexGuard<'_, IncentiveEngine> {
        // Commands never leave the engine half-updated, so a poisoned lock
        // still guards a consistent value.
        self.engine.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn apply<F>(&self, command: F) -> Vec<Event>
    where
        F: FnOnce(&mut IncentiveEngine, DateTime<Utc>) -> Transition,
    {
        let mut engine = self.lock();
        let transition = command(&mut *engine, self.now());
        self.commit(&engine, &transition);
        transition.events
    }

    /// Must be called with the engine lock held.
    fn commit(&self, engine: &IncentiveEngine, transition: &Transition) {
        for event in &transition.events {
            match event {
                Event::TokensEarned { .. }
                | Event::BalanceReset { .. }
                | Event::SettingChanged { .. }
                | Event::AdEligible { .. } => info!(?event, "committed"),
                _ => debug!(?event, "committed"),
            }
        }

        if transition.changed.balance {
            self.enqueue(BALANCE_KEY, engine.account().encode());
        }
        if transition.changed.settings {
            match engine.settings().encode() {
                Ok(value) => self.enqueue(SETTINGS_KEY, value),
                Err(e) => error!(error = %e, "could not encode settings; skipping write"),
            }
        }

        let next = engine.snapshot();
        self.snapshots.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
    }

    fn enqueue(&self, key: &'static str, value: String) {
        if self.writes.send(WriteRequest::Put { key, value }).is_err() {
            warn!(key, "persistence writer has stopped; change kept in memory only");
        }
    }
}

/// Records store timestamps as epoch milliseconds, so the engine only ever
/// sees millisecond instants and a reload reproduces memory exactly.
fn persisted_now(clock: &dyn Clock) -> DateTime<Utc> {
    clock.now().trunc_subsecs(3)
}

async fn load_record<T, F>(store: &dyn KeyValueStore, key: &str, decode: F) -> T
where
    T: Default,
    F: Fn(&str) -> Result<T>,
{
    match store.get(key).await {
        Ok(Some(text)) => match decode(&text) {
            Ok(record) => record,
            Err(e) => {
                warn!(key, error = %e, "discarding undecodable record; using defaults");
                T::default()
            }
        },
        Ok(None) => {
            debug!(key, "no stored record; using defaults");
            T::default()
        }
        Err(e) => {
            warn!(key, error = %e, "could not read record; using defaults");
            T::default()
        }
    }
}

async fn run_writer(
    store: Arc<dyn KeyValueStore>,
    mut requests: mpsc::UnboundedReceiver<WriteRequest>,
    policy: PersistenceConfig,
) {
    while let Some(request) = requests.recv().await {
        match request {
            WriteRequest::Put { key, value } => {
                write_with_retry(store.as_ref(), key, &value, &policy).await;
            }
            WriteRequest::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
    debug!("persistence writer stopped");
}

async fn write_with_retry(
    store: &dyn KeyValueStore,
    key: &str,
    value: &str,
    policy: &PersistenceConfig,
) {
    let mut attempt: u32 = 0;
    loop {
        match store.set(key, value).await {
            Ok(()) => {
                debug!(key, "record persisted");
                return;
            }
            Err(e) if attempt < policy.max_retries => {
                attempt += 1;
                warn!(key, attempt, error = %e, "write failed; retrying");
                tokio::time::sleep(policy.retry_backoff() * attempt).await;
            }
            Err(e) => {
                error!(
                    key,
                    attempts = attempt + 1,
                    error = %e,
                    "write abandoned; last successful value remains on disk"
                );
                return;
            }
        }
    }
}

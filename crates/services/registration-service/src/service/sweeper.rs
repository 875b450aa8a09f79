//! Background eviction of expired staged registrations.
//!
//! The sweeper shares the store (and through it the clock) with the
//! registration workflow. Its lifecycle is owned by whoever calls
//! [`ExpirySweeper::start`]; dropping the returned handle without calling
//! [`SweeperHandle::shutdown`] leaves the task running until the runtime exits.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use common::RegistrationConfig;

use crate::store::{PendingRegistrationStore, SweepReport};

/// Shortest interval accepted by the sweeper.
const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(1);

/// One sweep pass with logging. Shared by the timer and manual triggers.
pub fn run_sweep(store: &PendingRegistrationStore, verbose: bool) -> SweepReport {
    let started = Instant::now();
    debug!("=== SCHEDULED CLEANUP START ===");

    if verbose {
        debug!(
            pending_registrations = store.size(),
            verification_codes = store.code_count(),
            "Starting cleanup"
        );
    }

    let report = store.sweep_expired();

    if verbose {
        for evicted in &report.evicted {
            match evicted.expired_at {
                Some(expired_at) => debug!(
                    email = %evicted.email,
                    expired_at = %expired_at,
                    "Cleaned up expired pending registration"
                ),
                None => debug!(email = %evicted.email, "Cleaned up orphaned verification code"),
            }
        }
    }

    let elapsed_ms = started.elapsed().as_millis() as u64;
    if report.removed_registrations > 0 || report.removed_codes > 0 {
        info!(
            removed_registrations = report.removed_registrations,
            removed_codes = report.removed_codes,
            elapsed_ms,
            remaining_registrations = store.size(),
            remaining_codes = store.code_count(),
            "=== CLEANUP COMPLETED ==="
        );
    } else if verbose {
        debug!(
            elapsed_ms,
            pending_registrations = store.size(),
            verification_codes = store.code_count(),
            "=== CLEANUP COMPLETED === No expired items found"
        );
    }

    report
}

/// Recurring task that evicts expired staged registrations.
pub struct ExpirySweeper {
    store: Arc<PendingRegistrationStore>,
    interval: Duration,
    verbose: bool,
}

impl ExpirySweeper {
    pub fn new(store: Arc<PendingRegistrationStore>, config: &RegistrationConfig) -> Self {
        Self {
            store,
            interval: config.sweep_interval(),
            verbose: config.verbose_logging,
        }
    }

    /// Override the sweep interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Run one sweep synchronously.
    pub fn sweep_now(&self) -> SweepReport {
        run_sweep(&self.store, self.verbose)
    }

    /// Spawn the periodic sweep on the current tokio runtime.
    pub fn start(self) -> SweeperHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let period = self.interval.max(MIN_SWEEP_INTERVAL);

        info!(interval_ms = period.as_millis() as u64, "Starting expiry sweeper");

        let task = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        self.sweep_now();
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }

            info!("Expiry sweeper stopped");
        });

        SweeperHandle {
            shutdown: shutdown_tx,
            task,
        }
    }
}

/// Handle to a running sweeper task.
pub struct SweeperHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Signal the task to stop and wait for it to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            warn!(error = %e, "Expiry sweeper task ended abnormally");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, ManualClock};
    use chrono::Duration as ChronoDuration;
    use domain::{RegistrationProfile, RoleAttributes, StagedRegistration, UserRole, VerificationCode};

    fn staged(email: &str, clock: &ManualClock, age_minutes: i64) -> StagedRegistration {
        let profile = RegistrationProfile {
            first_name: "Amina".into(),
            last_name: "Yusuf".into(),
            email: email.into(),
            phone_number: None,
            password_hash: "hash".into(),
            role: UserRole::Farmer,
            attributes: RoleAttributes::empty_for(UserRole::Farmer),
            location: None,
            bio: None,
            verified: false,
        };
        StagedRegistration::new(
            profile,
            VerificationCode::parse("482913").unwrap(),
            clock.now() - ChronoDuration::minutes(age_minutes),
            ChronoDuration::minutes(15),
        )
    }

    fn setup() -> (Arc<ManualClock>, Arc<PendingRegistrationStore>) {
        let clock = Arc::new(ManualClock::default());
        let store = Arc::new(PendingRegistrationStore::new(clock.clone()));
        (clock, store)
    }

    #[test]
    fn test_sweep_now_removes_expired() {
        let (clock, store) = setup();
        store.put(staged("old@x.com", &clock, 16));
        store.put(staged("new@x.com", &clock, 14));

        let sweeper = ExpirySweeper::new(store.clone(), &RegistrationConfig::default());
        let report = sweeper.sweep_now();

        assert_eq!(report.removed_registrations, 1);
        assert_eq!(store.size(), 1);
        assert!(store.get("new@x.com").is_some());
    }

    #[tokio::test]
    async fn test_background_sweep_runs_and_stops() {
        let (clock, store) = setup();
        store.put(staged("a@x.com", &clock, 0));

        let handle = ExpirySweeper::new(store.clone(), &RegistrationConfig::default())
            .with_interval(Duration::from_millis(10))
            .start();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(store.size(), 1);

        clock.advance(ChronoDuration::minutes(16));
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(store.size(), 0);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_before_first_tick() {
        let (_clock, store) = setup();
        let handle = ExpirySweeper::new(store, &RegistrationConfig::default()).start();
        handle.shutdown().await;
    }
}

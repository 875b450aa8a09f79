//! In-memory staging area for unconfirmed registrations.
//!
//! Registrations and their verification codes live in two maps keyed by
//! normalized email. Both maps sit behind one mutex so every per-key
//! operation is linearizable; the lock is never held across an `.await`.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use uuid::Uuid;

use domain::{RegistrationProfile, StagedRegistration, VerificationCode};

use crate::clock::Clock;

/// Registration data without its code.
#[derive(Debug, Clone)]
struct StagedRecord {
    id: Uuid,
    profile: RegistrationProfile,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Inner {
    registrations: HashMap<String, StagedRecord>,
    codes: HashMap<String, VerificationCode>,
}

impl Inner {
    fn snapshot(&self, email: &str) -> Option<StagedRegistration> {
        let record = self.registrations.get(email)?;
        let Some(code) = self.codes.get(email) else {
            tracing::warn!(email = %email, "Staged registration has no verification code");
            return None;
        };
        Some(StagedRegistration {
            id: record.id,
            email: email.to_string(),
            profile: record.profile.clone(),
            created_at: record.created_at,
            expires_at: record.expires_at,
            verification_code: code.clone(),
        })
    }

    fn insert(&mut self, registration: StagedRegistration) -> bool {
        let StagedRegistration {
            id,
            email,
            profile,
            created_at,
            expires_at,
            verification_code,
        } = registration;
        self.codes.insert(email.clone(), verification_code);
        self.registrations
            .insert(
                email,
                StagedRecord {
                    id,
                    profile,
                    created_at,
                    expires_at,
                },
            )
            .is_some()
    }

    fn remove(&mut self, email: &str) -> (bool, bool) {
        let registration = self.registrations.remove(email).is_some();
        let code = self.codes.remove(email).is_some();
        (registration, code)
    }
}

/// Result of looking up a staged registration.
#[derive(Debug, Clone)]
pub enum PendingLookup {
    /// No registration is staged for the email.
    Missing,
    /// The registration had expired and was removed by this lookup.
    Expired { expired_at: DateTime<Utc> },
    /// A live registration.
    Live(StagedRegistration),
}

/// Outcome of an explicit removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Removal {
    pub registration_removed: bool,
    pub code_removed: bool,
}

impl Removal {
    /// Whether anything was present to remove.
    pub fn removed(&self) -> bool {
        self.registration_removed || self.code_removed
    }
}

/// An entry evicted by a sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evicted {
    pub email: String,
    /// `None` for an orphaned code with no registration.
    pub expired_at: Option<DateTime<Utc>>,
}

/// Counts from one sweep pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub removed_registrations: usize,
    pub removed_codes: usize,
    pub evicted: Vec<Evicted>,
}

/// Concurrency-safe store of staged registrations.
pub struct PendingRegistrationStore {
    inner: Mutex<Inner>,
    clock: Arc<dyn Clock>,
}

impl PendingRegistrationStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            clock,
        }
    }

    /// Current time according to the injected clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Insert or wholesale replace the entry for `registration.email`.
    ///
    /// Returns `true` if an earlier entry was replaced.
    pub fn put(&self, registration: StagedRegistration) -> bool {
        self.inner.lock().insert(registration)
    }

    /// Insert unless a live registration already holds the key.
    ///
    /// An expired occupant is replaced. Returns `false` when rejected.
    pub fn put_if_vacant(&self, registration: StagedRegistration) -> bool {
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        if let Some(existing) = inner.registrations.get(&registration.email) {
            if now <= existing.expires_at {
                return false;
            }
        }
        inner.insert(registration);
        true
    }

    /// Current entry for the email, expired or not.
    pub fn get(&self, email: &str) -> Option<StagedRegistration> {
        self.inner.lock().snapshot(email)
    }

    /// Look up a live entry, removing it if it has expired.
    pub fn lookup(&self, email: &str) -> PendingLookup {
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        let expired_at = match inner.registrations.get(email) {
            None => return PendingLookup::Missing,
            Some(record) if now > record.expires_at => record.expires_at,
            Some(_) => {
                return match inner.snapshot(email) {
                    Some(staged) => PendingLookup::Live(staged),
                    None => PendingLookup::Missing,
                }
            }
        };
        inner.remove(email);
        PendingLookup::Expired { expired_at }
    }

    /// Remove the entry and its code. Idempotent.
    pub fn remove(&self, email: &str) -> Removal {
        let (registration_removed, code_removed) = self.inner.lock().remove(email);
        Removal {
            registration_removed,
            code_removed,
        }
    }

    /// Remove the entry only if it is still the given generation.
    ///
    /// Guards against deleting a newer signup that replaced the one a
    /// caller looked up before making an outbound call.
    pub fn remove_generation(&self, email: &str, id: Uuid) -> bool {
        let mut inner = self.inner.lock();
        match inner.registrations.get(email) {
            Some(record) if record.id == id => {
                inner.remove(email);
                true
            }
            _ => false,
        }
    }

    /// Swap the code of an existing entry. Profile, `created_at` and
    /// `expires_at` are left untouched. Returns `false` if absent.
    pub fn replace_code(&self, email: &str, code: VerificationCode) -> bool {
        let mut inner = self.inner.lock();
        if !inner.registrations.contains_key(email) {
            return false;
        }
        inner.codes.insert(email.to_string(), code);
        true
    }

    /// `None` when nothing is staged for the email.
    pub fn is_expired(&self, email: &str) -> Option<bool> {
        let now = self.clock.now();
        self.inner
            .lock()
            .registrations
            .get(email)
            .map(|record| now > record.expires_at)
    }

    /// Number of staged registrations.
    pub fn size(&self) -> usize {
        self.inner.lock().registrations.len()
    }

    /// Number of stored verification codes.
    pub fn code_count(&self) -> usize {
        self.inner.lock().codes.len()
    }

    /// Evict every expired registration with its code, then drop any code
    /// whose registration is gone.
    pub fn sweep_expired(&self) -> SweepReport {
        let now = self.clock.now();
        let mut report = SweepReport::default();
        let mut inner = self.inner.lock();

        let expired: Vec<(String, DateTime<Utc>)> = inner
            .registrations
            .iter()
            .filter(|(_, record)| now > record.expires_at)
            .map(|(email, record)| (email.clone(), record.expires_at))
            .collect();

        for (email, expired_at) in expired {
            let (registration, code) = inner.remove(&email);
            if registration {
                report.removed_registrations += 1;
            }
            if code {
                report.removed_codes += 1;
            }
            report.evicted.push(Evicted {
                email,
                expired_at: Some(expired_at),
            });
        }

        let Inner {
            registrations,
            codes,
        } = &mut *inner;
        codes.retain(|email, _| {
            let keep = registrations.contains_key(email);
            if !keep {
                report.removed_codes += 1;
                report.evicted.push(Evicted {
                    email: email.clone(),
                    expired_at: None,
                });
            }
            keep
        });

        report
    }

    #[cfg(test)]
    fn insert_orphan_code(&self, email: &str, code: VerificationCode) {
        self.inner.lock().codes.insert(email.to_string(), code);
    }
}

//! Workflow scenarios run against the real store with hand-written collaborators.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use parking_lot::Mutex;
use tokio::sync::Notify;
use uuid::Uuid;

use common::{AppError, AppResult, RegistrationConfig};
use domain::{RegistrationProfile, User, UserRole, VerificationCode};
use registration_service_lib::client::{Notifier, UserDirectory};
use registration_service_lib::clock::ManualClock;
use registration_service_lib::code::{RandomCodeGenerator, SequenceCodeGenerator};
use registration_service_lib::service::{NewRegistration, Registrar, RegistrationService};
use registration_service_lib::store::PendingRegistrationStore;

// =============================================================================
// Fakes
// =============================================================================

#[derive(Default)]
struct FakeDirectory {
    users: Mutex<HashMap<String, User>>,
}

#[async_trait]
impl UserDirectory for FakeDirectory {
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        Ok(self.users.lock().get(email).cloned())
    }

    async fn create(&self, profile: RegistrationProfile) -> AppResult<User> {
        let mut users = self.users.lock();
        if users.contains_key(&profile.email) {
            return Err(AppError::conflict("User with this email already exists"));
        }
        let user = User::from_profile(Uuid::new_v4(), profile, chrono::Utc::now());
        users.insert(user.email.clone(), user.clone());
        Ok(user)
    }
}

/// Directory whose `create` parks until released, so a test can act while
/// the user is being persisted.
#[derive(Default)]
struct GatedDirectory {
    inner: FakeDirectory,
    entered: Notify,
    release: Notify,
}

#[async_trait]
impl UserDirectory for GatedDirectory {
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        self.inner.find_by_email(email).await
    }

    async fn create(&self, profile: RegistrationProfile) -> AppResult<User> {
        self.entered.notify_one();
        self.release.notified().await;
        self.inner.create(profile).await
    }
}

/// Records every code it is asked to deliver.
#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
    failing: AtomicBool,
}

impl RecordingNotifier {
    fn last_code_for(&self, email: &str) -> Option<String> {
        self.sent
            .lock()
            .iter()
            .rev()
            .find(|(to, _)| to == email)
            .map(|(_, code)| code.clone())
    }

    fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_verification_code(&self, email: &str, code: &VerificationCode) -> AppResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::delivery("mail relay unavailable"));
        }
        self.sent
            .lock()
            .push((email.to_string(), code.as_str().to_string()));
        Ok(())
    }
}

struct Fixture {
    clock: Arc<ManualClock>,
    store: Arc<PendingRegistrationStore>,
    users: Arc<FakeDirectory>,
    notifier: Arc<RecordingNotifier>,
    registrar: Registrar,
}

fn fixture_with(codes: Arc<dyn registration_service_lib::code::CodeGenerator>) -> Fixture {
    let clock = Arc::new(ManualClock::default());
    let store = Arc::new(PendingRegistrationStore::new(clock.clone()));
    let users = Arc::new(FakeDirectory::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let registrar = Registrar::new(
        store.clone(),
        users.clone(),
        notifier.clone(),
        codes,
        RegistrationConfig::default(),
    );
    Fixture {
        clock,
        store,
        users,
        notifier,
        registrar,
    }
}

struct GatedFixture {
    store: Arc<PendingRegistrationStore>,
    users: Arc<GatedDirectory>,
    registrar: Arc<Registrar>,
}

fn gated_fixture(codes: &[&str]) -> GatedFixture {
    let clock = Arc::new(ManualClock::default());
    let store = Arc::new(PendingRegistrationStore::new(clock));
    let users = Arc::new(GatedDirectory::default());
    let registrar = Registrar::new(
        store.clone(),
        users.clone(),
        Arc::new(RecordingNotifier::default()),
        Arc::new(SequenceCodeGenerator::new(codes.iter().copied())),
        RegistrationConfig::default(),
    );
    GatedFixture {
        store,
        users,
        registrar: Arc::new(registrar),
    }
}

fn fixture() -> Fixture {
    fixture_with(Arc::new(RandomCodeGenerator))
}

fn signup_input(email: &str, role: &str) -> NewRegistration {
    NewRegistration {
        first_name: "Amina".to_string(),
        last_name: "Yusuf".to_string(),
        email: email.to_string(),
        phone_number: Some("+1555".to_string()),
        password: "harvest-2024".to_string(),
        role: role.to_string(),
        ..Default::default()
    }
}

// =============================================================================
// Scenarios
// =============================================================================

#[tokio::test]
async fn test_amina_signs_up_and_verifies_once() {
    let f = fixture_with(Arc::new(SequenceCodeGenerator::new(["482913"])));

    let outcome = f
        .registrar
        .signup(signup_input("a@x.com", "FARMER"))
        .await
        .unwrap();
    assert_eq!(outcome.email, "a@x.com");
    assert_eq!(f.notifier.last_code_for("a@x.com").as_deref(), Some("482913"));

    let user = f.registrar.verify_code("a@x.com", "482913").await.unwrap();
    assert_eq!(user.role, UserRole::Farmer);
    assert!(user.verified);
    assert!(user.enabled);
    assert_eq!(user.full_name(), "Amina Yusuf");
    assert!(f.users.users.lock().contains_key("a@x.com"));

    let err = f.registrar.verify_code("a@x.com", "482913").await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_wizard_role_is_rejected_without_staging() {
    let f = fixture();

    let err = f
        .registrar
        .signup(signup_input("w@x.com", "wizard"))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Validation(ref msg) if msg == "invalid role"));
    assert_eq!(f.store.size(), 0);
    assert!(f.notifier.last_code_for("w@x.com").is_none());
}

#[tokio::test]
async fn test_signup_for_persisted_user_conflicts() {
    let f = fixture();
    f.registrar
        .signup(signup_input("a@x.com", "HERDER"))
        .await
        .unwrap();
    let code = f.notifier.last_code_for("a@x.com").unwrap();
    f.registrar.verify_code("a@x.com", &code).await.unwrap();

    let err = f
        .registrar
        .signup(signup_input("A@X.com", "HERDER"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    assert_eq!(err.code(), "CONFLICT");
}

#[tokio::test]
async fn test_wrong_code_keeps_registration_and_resend_recovers() {
    let f = fixture();
    f.registrar
        .signup(signup_input("a@x.com", "FARMER"))
        .await
        .unwrap();
    let first = f.notifier.last_code_for("a@x.com").unwrap();
    let wrong = if first == "999999" { "100000" } else { "999999" };

    let err = f.registrar.verify_code("a@x.com", wrong).await.unwrap_err();
    assert!(matches!(err, AppError::Mismatch));
    assert!(err.is_recoverable());
    assert_eq!(f.store.size(), 1);

    f.registrar.resend_code("a@x.com").await.unwrap();
    let second = f.notifier.last_code_for("a@x.com").unwrap();
    assert_eq!(second.len(), 6);
    assert!(f.registrar.verify_code("a@x.com", &second).await.is_ok());
}

#[tokio::test]
async fn test_resend_invalidates_previous_code() {
    let f = fixture_with(Arc::new(SequenceCodeGenerator::new(["111111", "222222"])));
    f.registrar
        .signup(signup_input("a@x.com", "FARMER"))
        .await
        .unwrap();
    f.registrar.resend_code("a@x.com").await.unwrap();

    let err = f.registrar.verify_code("a@x.com", "111111").await.unwrap_err();
    assert!(matches!(err, AppError::Mismatch));
    assert!(f.registrar.verify_code("a@x.com", "222222").await.is_ok());
}

#[tokio::test]
async fn test_cancel_twice_reports_removed_then_not() {
    let f = fixture();
    f.registrar
        .signup(signup_input("a@x.com", "ADMIN"))
        .await
        .unwrap();

    let first = f.registrar.cancel_registration("a@x.com").await.unwrap();
    let second = f.registrar.cancel_registration("a@x.com").await.unwrap();

    assert!(first.removed());
    assert!(!second.removed());
    assert_eq!(f.store.size(), 0);
}

#[tokio::test]
async fn test_expired_registration_is_rejected_then_gone() {
    let f = fixture();
    f.registrar
        .signup(signup_input("a@x.com", "FARMER"))
        .await
        .unwrap();
    let code = f.notifier.last_code_for("a@x.com").unwrap();

    f.clock.advance(Duration::minutes(15) + Duration::seconds(1));

    let err = f.registrar.verify_code("a@x.com", &code).await.unwrap_err();
    assert!(matches!(err, AppError::Expired));
    assert_eq!(err.code(), "EXPIRED");

    let err = f.registrar.verify_code("a@x.com", &code).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_registration_valid_at_exact_expiry_instant() {
    let f = fixture();
    f.registrar
        .signup(signup_input("a@x.com", "FARMER"))
        .await
        .unwrap();
    let code = f.notifier.last_code_for("a@x.com").unwrap();

    f.clock.advance(Duration::minutes(15));

    assert!(f.registrar.verify_code("a@x.com", &code).await.is_ok());
}

#[tokio::test]
async fn test_delivery_failure_then_resend() {
    let f = fixture();
    f.notifier.fail(true);

    let err = f
        .registrar
        .signup(signup_input("a@x.com", "FARMER"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Delivery(_)));
    assert_eq!(f.store.size(), 1);

    f.notifier.fail(false);
    f.registrar.resend_code("a@x.com").await.unwrap();
    let code = f.notifier.last_code_for("a@x.com").unwrap();
    assert!(f.registrar.verify_code("a@x.com", &code).await.is_ok());
}

#[tokio::test]
async fn test_sweep_removes_exactly_the_expired_registration() {
    let f = fixture();

    f.registrar
        .signup(signup_input("old@x.com", "FARMER"))
        .await
        .unwrap();
    f.clock.advance(Duration::minutes(2));
    f.registrar
        .signup(signup_input("fresh@x.com", "HERDER"))
        .await
        .unwrap();

    // old@x.com expired one minute ago, fresh@x.com expires in one minute
    f.clock.advance(Duration::minutes(14));

    let report = f.registrar.trigger_sweep();
    assert_eq!(report.removed_registrations, 1);
    assert_eq!(report.removed_codes, 1);
    assert_eq!(f.registrar.pending_count(), 1);

    let err = f.registrar.resend_code("old@x.com").await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_concurrent_signups_for_distinct_emails() {
    let f = Arc::new(fixture());

    let mut handles = Vec::new();
    for i in 0..8 {
        let f = f.clone();
        handles.push(tokio::spawn(async move {
            f.registrar
                .signup(signup_input(&format!("user{i}@x.com"), "FARMER"))
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(f.store.size(), 8);
    assert_eq!(f.notifier.sent.lock().len(), 8);
}

#[tokio::test]
async fn test_signup_during_verify_keeps_replacement() {
    let f = gated_fixture(&["111111", "222222"]);
    f.registrar
        .signup(signup_input("a@x.com", "FARMER"))
        .await
        .unwrap();

    let registrar = f.registrar.clone();
    let verify = tokio::spawn(async move { registrar.verify_code("a@x.com", "111111").await });

    f.users.entered.notified().await;
    f.registrar
        .signup(signup_input("a@x.com", "HERDER"))
        .await
        .unwrap();
    f.users.release.notify_one();

    let user = verify.await.unwrap().unwrap();
    assert_eq!(user.role, UserRole::Farmer);

    // The replacement staged while the first user was persisted is left alone
    let staged = f.store.get("a@x.com").unwrap();
    assert_eq!(staged.verification_code.as_str(), "222222");
    assert_eq!(staged.profile.role, UserRole::Herder);

    f.users.release.notify_one();
    let err = f.registrar.verify_code("a@x.com", "222222").await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    assert_eq!(f.store.size(), 1);
}

#[tokio::test]
async fn test_cancel_during_verify_removes_once() {
    let f = gated_fixture(&["482913"]);
    f.registrar
        .signup(signup_input("a@x.com", "FARMER"))
        .await
        .unwrap();

    let registrar = f.registrar.clone();
    let verify = tokio::spawn(async move { registrar.verify_code("a@x.com", "482913").await });

    f.users.entered.notified().await;
    let removal = f.registrar.cancel_registration("a@x.com").await.unwrap();
    assert!(removal.removed());
    f.users.release.notify_one();

    // Verification already passed the code check, so the user is still created
    assert!(verify.await.unwrap().is_ok());
    assert_eq!(f.store.size(), 0);

    let again = f.registrar.cancel_registration("a@x.com").await.unwrap();
    assert!(!again.removed());
}

#[tokio::test]
async fn test_cancel_before_verify_wins() {
    let f = fixture_with(Arc::new(SequenceCodeGenerator::new(["482913"])));
    f.registrar
        .signup(signup_input("a@x.com", "FARMER"))
        .await
        .unwrap();

    assert!(f.registrar.cancel_registration("a@x.com").await.unwrap().removed());

    let err = f.registrar.verify_code("a@x.com", "482913").await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    assert!(f.users.users.lock().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_verify_and_cancel_settle_consistently() {
    let f = Arc::new(fixture());

    for i in 0..6 {
        let email = format!("race{i}@x.com");
        f.registrar
            .signup(signup_input(&email, "FARMER"))
            .await
            .unwrap();
        let code = f.notifier.last_code_for(&email).unwrap();

        let verify = {
            let (f, email) = (f.clone(), email.clone());
            tokio::spawn(async move { f.registrar.verify_code(&email, &code).await })
        };
        let cancel = {
            let (f, email) = (f.clone(), email.clone());
            tokio::spawn(async move { f.registrar.cancel_registration(&email).await })
        };

        let verified = verify.await.unwrap();
        let removal = cancel.await.unwrap().unwrap();

        assert!(f.store.get(&email).is_none());
        match verified {
            Ok(user) => assert!(f.users.users.lock().contains_key(&user.email)),
            Err(err) => {
                assert!(matches!(err, AppError::NotFound(_)), "unexpected {err:?}");
                assert!(removal.removed());
                assert!(!f.users.users.lock().contains_key(&email));
            }
        }
    }
}

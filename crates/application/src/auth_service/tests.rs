use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, TimeZone, Utc};

use rantboard_core::{AppError, AppResult, Role, UserIdentity};
use rantboard_domain::LockoutPolicy;

use super::{
    AuthService, CredentialRecord, CredentialRepository, IssuedToken, LoginOutcome,
    NewCredential, PasswordHasher, RegisterParams, TokenService,
};
use crate::{Clock, LoginLockoutTracker};

struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    fn advance(&self, delta: TimeDelta) -> AppResult<()> {
        let mut now = self
            .now
            .lock()
            .map_err(|error| AppError::Internal(format!("failed to lock clock: {error}")))?;
        *now += delta;
        Ok(())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now
            .lock()
            .map(|now| *now)
            .unwrap_or_else(|poisoned| *poisoned.into_inner())
    }
}

#[derive(Default)]
struct FakeCredentialRepository {
    credentials: Mutex<HashMap<String, CredentialRecord>>,
}

impl FakeCredentialRepository {
    fn with(records: Vec<CredentialRecord>) -> Self {
        Self {
            credentials: Mutex::new(
                records
                    .into_iter()
                    .map(|record| (record.login.clone(), record))
                    .collect(),
            ),
        }
    }
}

#[async_trait]
impl CredentialRepository for FakeCredentialRepository {
    async fn find_by_login(&self, login: &str) -> AppResult<Option<CredentialRecord>> {
        Ok(self
            .credentials
            .lock()
            .map_err(|error| AppError::Internal(format!("failed to lock repo state: {error}")))?
            .get(&login.to_lowercase())
            .cloned())
    }

    async fn create(&self, credential: NewCredential) -> AppResult<CredentialRecord> {
        let mut credentials = self
            .credentials
            .lock()
            .map_err(|error| AppError::Internal(format!("failed to lock repo state: {error}")))?;
        if credentials.contains_key(&credential.login) {
            return Err(AppError::Conflict("login already registered".to_owned()));
        }

        let record = CredentialRecord {
            subject: credential.subject,
            login: credential.login,
            display_name: credential.display_name,
            password_hash: credential.password_hash,
            role: credential.role,
        };
        credentials.insert(record.login.clone(), record.clone());
        Ok(record)
    }
}

#[derive(Default)]
struct FakeHasher {
    hash_calls: Mutex<u32>,
}

impl PasswordHasher for FakeHasher {
    fn hash_password(&self, password: &str) -> AppResult<String> {
        if let Ok(mut calls) = self.hash_calls.lock() {
            *calls += 1;
        }
        Ok(format!("hashed:{password}"))
    }

    fn verify_password(&self, password: &str, hash: &str) -> AppResult<bool> {
        Ok(hash == format!("hashed:{password}"))
    }
}

/// Locks `source` while verifying, like a concurrent attempt that reaches
/// the threshold first.
struct LockingHasher {
    lockout: LoginLockoutTracker,
    source: &'static str,
}

impl PasswordHasher for LockingHasher {
    fn hash_password(&self, password: &str) -> AppResult<String> {
        Ok(format!("hashed:{password}"))
    }

    fn verify_password(&self, _password: &str, _hash: &str) -> AppResult<bool> {
        while self.lockout.active_lock(self.source)?.is_none() {
            self.lockout.record_failure(self.source)?;
        }
        Ok(false)
    }
}

struct BrokenHasher;

impl PasswordHasher for BrokenHasher {
    fn hash_password(&self, _password: &str) -> AppResult<String> {
        Err(AppError::Internal("hasher unavailable".to_owned()))
    }

    fn verify_password(&self, _password: &str, _hash: &str) -> AppResult<bool> {
        Err(AppError::Internal("hasher unavailable".to_owned()))
    }
}

struct FakeTokenService {
    clock: Arc<ManualClock>,
}

impl TokenService for FakeTokenService {
    fn issue(&self, identity: &UserIdentity) -> AppResult<IssuedToken> {
        Ok(IssuedToken {
            token: format!("{}|{}|{}", identity.subject(), identity.login(), identity.role()),
            expires_at: self.clock.now() + TimeDelta::hours(24),
            identity: identity.clone(),
        })
    }

    fn verify(&self, token: &str) -> AppResult<UserIdentity> {
        let parts: Vec<&str> = token.split('|').collect();
        let [subject, login, role] = parts.as_slice() else {
            return Err(AppError::Unauthorized("invalid or expired token".to_owned()));
        };

        Ok(UserIdentity::new(*subject, *login, role.parse::<Role>()?))
    }
}

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0)
        .single()
        .unwrap_or_else(|| panic!("valid timestamp"))
}

fn admin_credential() -> CredentialRecord {
    CredentialRecord {
        subject: "admin-1".to_owned(),
        login: "admin".to_owned(),
        display_name: "Admin".to_owned(),
        password_hash: "hashed:correct-horse".to_owned(),
        role: Role::Admin,
    }
}

fn admin_service_with(
    password_hasher: Arc<dyn PasswordHasher>,
    lockout: LoginLockoutTracker,
    clock: Arc<ManualClock>,
) -> AuthService {
    AuthService::new(
        Role::Admin,
        Arc::new(FakeCredentialRepository::with(vec![admin_credential()])),
        password_hasher,
        Arc::new(FakeTokenService { clock }),
        lockout,
    )
}

struct Harness {
    admin: AuthService,
    users: AuthService,
    clock: Arc<ManualClock>,
    hasher: Arc<FakeHasher>,
}

fn harness() -> Harness {
    let clock = Arc::new(ManualClock {
        now: Mutex::new(start()),
    });
    let repository = Arc::new(FakeCredentialRepository::with(vec![
        admin_credential(),
        CredentialRecord {
            subject: "42".to_owned(),
            login: "sam@example.com".to_owned(),
            display_name: "Sam".to_owned(),
            password_hash: "hashed:sams-long-password".to_owned(),
            role: Role::User,
        },
    ]));
    let hasher = Arc::new(FakeHasher::default());
    let tokens = Arc::new(FakeTokenService {
        clock: clock.clone(),
    });

    let service = |realm: Role| {
        AuthService::new(
            realm,
            repository.clone(),
            hasher.clone(),
            tokens.clone(),
            LoginLockoutTracker::new(LockoutPolicy::default(), clock.clone()),
        )
    };

    Harness {
        admin: service(Role::Admin),
        users: service(Role::User),
        clock,
        hasher,
    }
}

#[tokio::test]
async fn two_failures_lock_the_source_even_for_correct_credentials() -> AppResult<()> {
    let harness = harness();
    let admin = &harness.admin;

    let first = admin.login("admin", "wrong", "9.9.9.9").await?;
    assert!(matches!(
        first,
        LoginOutcome::InvalidCredentials {
            remaining_attempts: 1
        }
    ));
    assert_eq!(first.message(), "Invalid credentials. 1 attempt remaining.");

    let second = admin.login("admin", "wrong", "9.9.9.9").await?;
    let expected_until = start() + TimeDelta::hours(24);
    assert_eq!(second.locked_until(), Some(expected_until));
    assert!(
        second
            .message()
            .starts_with("Too many failed attempts. Account locked for 24 hours until")
    );

    let third = admin.login("admin", "correct-horse", "9.9.9.9").await?;
    assert_eq!(third.locked_until(), Some(expected_until));
    assert!(third.message().starts_with("Account locked. Try again after"));
    assert_eq!(
        admin.lockout().stats()?.records[0].failure_count,
        2,
        "locked attempts are not counted"
    );
    Ok(())
}

#[tokio::test]
async fn lock_set_during_verification_reads_as_already_locked() -> AppResult<()> {
    let clock = Arc::new(ManualClock {
        now: Mutex::new(start()),
    });
    let lockout = LoginLockoutTracker::new(LockoutPolicy::default(), clock.clone());
    let hasher = Arc::new(LockingHasher {
        lockout: lockout.clone(),
        source: "9.9.9.9",
    });
    let admin = admin_service_with(hasher, lockout, clock);

    let outcome = admin.login("admin", "wrong", "9.9.9.9").await?;
    assert!(matches!(
        outcome,
        LoginOutcome::Locked {
            locked_for: None,
            ..
        }
    ));
    assert_eq!(outcome.locked_until(), Some(start() + TimeDelta::hours(24)));
    assert!(outcome.message().starts_with("Account locked. Try again after"));
    assert_eq!(admin.lockout().stats()?.records[0].failure_count, 2);
    Ok(())
}

#[tokio::test]
async fn failing_equalising_hash_still_counts_the_failure() -> AppResult<()> {
    let clock = Arc::new(ManualClock {
        now: Mutex::new(start()),
    });
    let lockout = LoginLockoutTracker::new(LockoutPolicy::default(), clock.clone());
    let admin = admin_service_with(Arc::new(BrokenHasher), lockout, clock);

    let outcome = admin.login("nobody", "whatever", "2.2.2.2").await?;
    assert!(matches!(
        outcome,
        LoginOutcome::InvalidCredentials {
            remaining_attempts: 1
        }
    ));
    Ok(())
}

#[tokio::test]
async fn correct_credentials_succeed_after_lock_expires() -> AppResult<()> {
    let harness = harness();
    let admin = &harness.admin;

    admin.login("admin", "wrong", "9.9.9.9").await?;
    admin.login("admin", "wrong", "9.9.9.9").await?;
    harness.clock.advance(TimeDelta::hours(24))?;

    let outcome = admin.login("admin", "correct-horse", "9.9.9.9").await?;
    let LoginOutcome::Authenticated(issued) = outcome else {
        return Err(AppError::Internal(format!("expected success, got {outcome:?}")));
    };
    assert_eq!(issued.identity.role(), Role::Admin);
    assert_eq!(admin.lockout().stats()?.total_records, 0);
    Ok(())
}

#[tokio::test]
async fn success_below_threshold_clears_failures() -> AppResult<()> {
    let harness = harness();
    let admin = &harness.admin;

    admin.login("admin", "wrong", "1.1.1.1").await?;
    let success = admin.login("admin", "correct-horse", "1.1.1.1").await?;
    assert!(matches!(success, LoginOutcome::Authenticated(_)));

    let again = admin.login("admin", "wrong", "1.1.1.1").await?;
    assert!(matches!(
        again,
        LoginOutcome::InvalidCredentials {
            remaining_attempts: 1
        }
    ));
    Ok(())
}

#[tokio::test]
async fn unknown_login_fails_like_a_wrong_password() -> AppResult<()> {
    let harness = harness();

    let unknown = harness.admin.login("nobody", "whatever", "2.2.2.2").await?;
    let wrong = harness.admin.login("admin", "whatever", "3.3.3.3").await?;

    assert_eq!(unknown.message(), wrong.message());
    let hash_calls = harness.hasher.hash_calls.lock().map(|calls| *calls).unwrap_or(0);
    assert_eq!(hash_calls, 1);
    Ok(())
}

#[tokio::test]
async fn user_credentials_do_not_open_the_admin_realm() -> AppResult<()> {
    let harness = harness();

    let outcome = harness
        .admin
        .login("sam@example.com", "sams-long-password", "4.4.4.4")
        .await?;
    assert!(matches!(outcome, LoginOutcome::InvalidCredentials { .. }));

    let user = harness
        .users
        .login("sam@example.com", "sams-long-password", "4.4.4.4")
        .await?;
    assert!(matches!(user, LoginOutcome::Authenticated(_)));
    Ok(())
}

#[tokio::test]
async fn realms_track_lockouts_separately() -> AppResult<()> {
    let harness = harness();

    harness.admin.login("admin", "wrong", "5.5.5.5").await?;
    harness.admin.login("admin", "wrong", "5.5.5.5").await?;

    let user = harness
        .users
        .login("sam@example.com", "sams-long-password", "5.5.5.5")
        .await?;
    assert!(matches!(user, LoginOutcome::Authenticated(_)));
    Ok(())
}

#[tokio::test]
async fn registration_validates_and_rejects_duplicates() -> AppResult<()> {
    let harness = harness();

    let issued = harness
        .users
        .register(RegisterParams {
            email: "New.Person@Example.com".to_owned(),
            password: "a-long-enough-secret".to_owned(),
            display_name: "New Person".to_owned(),
        })
        .await?;
    assert_eq!(issued.identity.login(), "new.person@example.com");
    assert_eq!(issued.identity.role(), Role::User);

    let duplicate = harness
        .users
        .register(RegisterParams {
            email: "new.person@example.com".to_owned(),
            password: "another-long-secret".to_owned(),
            display_name: "Someone".to_owned(),
        })
        .await;
    assert!(matches!(duplicate, Err(AppError::Conflict(_))));

    let weak = harness
        .users
        .register(RegisterParams {
            email: "weak@example.com".to_owned(),
            password: "short".to_owned(),
            display_name: "Weak".to_owned(),
        })
        .await;
    assert!(matches!(weak, Err(AppError::Validation(_))));

    let login = harness
        .users
        .login("new.person@example.com", "a-long-enough-secret", "6.6.6.6")
        .await?;
    assert!(matches!(login, LoginOutcome::Authenticated(_)));
    Ok(())
}

#[tokio::test]
async fn admin_realm_refuses_registration() {
    let harness = harness();
    let result = harness
        .admin
        .register(RegisterParams {
            email: "x@example.com".to_owned(),
            password: "a-long-enough-secret".to_owned(),
            display_name: "X".to_owned(),
        })
        .await;
    assert!(matches!(result, Err(AppError::Forbidden(_))));
}

#[test]
fn verify_token_requires_matching_realm() -> AppResult<()> {
    let harness = harness();

    let identity = harness.users.verify_token("42|sam@example.com|user")?;
    assert_eq!(identity.subject(), "42");

    assert!(harness.admin.verify_token("42|sam@example.com|user").is_err());
    assert!(harness.users.verify_token("garbage").is_err());
    Ok(())
}

use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, PublicUser, RegisterRequest},
        jwt::JwtKeys,
        lockout::LockoutPolicy,
        password::PasswordHasher,
        repo::AccountRepo,
        repo_types::{Account, AccountStatus, Role},
    },
    error::AppError,
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}

/// Field checks for registration; the first failing rule wins.
pub fn validate_registration(req: &RegisterRequest) -> Result<(), AppError> {
    let required = [
        (&req.username, "Username"),
        (&req.email, "Email"),
        (&req.password, "Password"),
        (&req.first_name, "First name"),
        (&req.last_name, "Last name"),
    ];
    if let Some((_, field)) = required.iter().find(|(v, _)| is_blank(v)) {
        return Err(AppError::validation(format!("{} is required", field)));
    }

    let username_len = req.username.chars().count();
    if !(3..=50).contains(&username_len) {
        return Err(AppError::validation(
            "Username must be between 3 and 50 characters",
        ));
    }
    if !is_valid_email(&req.email) {
        return Err(AppError::validation("Invalid email format"));
    }
    let password_len = req.password.chars().count();
    if !(6..=100).contains(&password_len) {
        return Err(AppError::validation(
            "Password must be between 6 and 100 characters",
        ));
    }
    Ok(())
}

/// Login, registration and token-subject lookup.
#[derive(Clone)]
pub struct AuthService {
    accounts: Arc<dyn AccountRepo>,
    hasher: PasswordHasher,
    keys: JwtKeys,
    lockout: LockoutPolicy,
}

impl AuthService {
    pub fn new(
        accounts: Arc<dyn AccountRepo>,
        hasher: PasswordHasher,
        keys: JwtKeys,
        lockout: LockoutPolicy,
    ) -> Self {
        Self {
            accounts,
            hasher,
            keys,
            lockout,
        }
    }

    pub async fn register(&self, req: RegisterRequest) -> Result<AuthResponse, AppError> {
        if let Err(e) = validate_registration(&req) {
            warn!(error = %e, "registration rejected");
            return Err(e);
        }

        if self.accounts.find_by_username(&req.username).await?.is_some() {
            warn!(username = %req.username, "username already exists");
            return Err(AppError::DuplicateUsername);
        }
        if self.accounts.find_by_email(&req.email).await?.is_some() {
            warn!(email = %req.email, "email already registered");
            return Err(AppError::DuplicateEmail);
        }

        let password_hash = self.hasher.hash(&req.password)?;
        let now = OffsetDateTime::now_utc();
        let account = Account {
            id: Uuid::new_v4(),
            username: req.username,
            email: req.email,
            password_hash,
            first_name: req.first_name,
            last_name: req.last_name,
            status: AccountStatus::Active,
            role: Role::User,
            failed_login_attempts: 0,
            lockout_until: None,
            created_at: now,
            updated_at: now,
        };
        self.accounts.create(&account).await?;

        let token = self.keys.issue(&account)?;
        info!(user_id = %account.id, username = %account.username, "user registered");
        Ok(AuthResponse {
            token,
            user: PublicUser::from(&account),
        })
    }

    pub async fn login(&self, req: LoginRequest) -> Result<AuthResponse, AppError> {
        self.login_at(req, OffsetDateTime::now_utc()).await
    }

    pub(crate) async fn login_at(
        &self,
        req: LoginRequest,
        now: OffsetDateTime,
    ) -> Result<AuthResponse, AppError> {
        if is_blank(&req.username) || is_blank(&req.password) {
            return Err(AppError::validation("Username and password are required"));
        }

        let mut account = match self.accounts.find_by_username(&req.username).await? {
            Some(a) => a,
            None => match self.accounts.find_by_email(&req.username).await? {
                Some(a) => a,
                None => {
                    warn!(login = %req.username, "login unknown user");
                    return Err(AppError::InvalidCredentials);
                }
            },
        };

        if self.lockout.is_locked(&account, now) {
            warn!(user_id = %account.id, until = ?account.lockout_until, "login on locked account");
            return Err(AppError::AccountLocked);
        }

        if !self.hasher.verify(&req.password, &account.password_hash)? {
            self.lockout.record_failure(&mut account, now);
            self.accounts.save_security(&account).await?;
            warn!(
                user_id = %account.id,
                attempts = account.failed_login_attempts,
                locked = self.lockout.is_locked(&account, now),
                "login invalid password"
            );
            return Err(AppError::InvalidCredentials);
        }

        if account.status != AccountStatus::Active {
            warn!(user_id = %account.id, status = %account.status, "login on inactive account");
            return Err(AppError::AccountInactive);
        }

        self.lockout.record_success(&mut account, now);
        self.accounts.save_security(&account).await?;

        let token = self.keys.issue(&account)?;
        info!(user_id = %account.id, username = %account.username, "user logged in");
        Ok(AuthResponse {
            token,
            user: PublicUser::from(&account),
        })
    }

    /// Resolves the subject of an already verified token.
    pub async fn current_user(&self, user_id: Uuid) -> Result<PublicUser, AppError> {
        let account = self
            .accounts
            .find_by_id(user_id)
            .await?
            .ok_or(AppError::UserNotFound)?;
        if account.status != AccountStatus::Active {
            return Err(AppError::AccountInactive);
        }
        Ok(PublicUser::from(&account))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::repo::CreateAccountError,
        config::{AppConfig, LockoutConfig},
        storage::MemoryStore,
    };
    use time::Duration;

    fn service() -> (AuthService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (service_over(store.clone()), store)
    }

    fn service_over(accounts: Arc<dyn AccountRepo>) -> AuthService {
        let cfg = AppConfig::for_tests();
        AuthService::new(
            accounts,
            PasswordHasher::new(&cfg.hashing).unwrap(),
            JwtKeys::new(&cfg.jwt),
            LockoutPolicy::from(&LockoutConfig {
                threshold: 5,
                minutes: 30,
            }),
        )
    }

    /// Lookups that never see an existing row, as when two registrations
    /// pass the duplicate checks before either inserts.
    struct StaleLookups(MemoryStore);

    #[async_trait::async_trait]
    impl AccountRepo for StaleLookups {
        async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Account>> {
            self.0.find_by_id(id).await
        }
        async fn find_by_username(&self, _: &str) -> anyhow::Result<Option<Account>> {
            Ok(None)
        }
        async fn find_by_email(&self, _: &str) -> anyhow::Result<Option<Account>> {
            Ok(None)
        }
        async fn create(&self, account: &Account) -> Result<(), CreateAccountError> {
            self.0.create(account).await
        }
        async fn save_security(&self, account: &Account) -> anyhow::Result<()> {
            self.0.save_security(account).await
        }
    }

    fn alice() -> RegisterRequest {
        RegisterRequest {
            username: "alice".into(),
            email: "alice@x.com".into(),
            password: "secret1".into(),
            first_name: "Alice".into(),
            last_name: "A".into(),
        }
    }

    fn login(username: &str, password: &str) -> LoginRequest {
        LoginRequest {
            username: username.into(),
            password: password.into(),
        }
    }

    #[test]
    fn registration_validation_messages() {
        let msg = |req: RegisterRequest| validate_registration(&req).unwrap_err().to_string();

        assert_eq!(
            msg(RegisterRequest {
                username: " ".into(),
                ..alice()
            }),
            "Username is required"
        );
        assert_eq!(
            msg(RegisterRequest {
                last_name: "".into(),
                ..alice()
            }),
            "Last name is required"
        );
        assert_eq!(
            msg(RegisterRequest {
                username: "al".into(),
                ..alice()
            }),
            "Username must be between 3 and 50 characters"
        );
        assert_eq!(
            msg(RegisterRequest {
                username: "a".repeat(51),
                ..alice()
            }),
            "Username must be between 3 and 50 characters"
        );
        assert_eq!(
            msg(RegisterRequest {
                email: "alice.x.com".into(),
                ..alice()
            }),
            "Invalid email format"
        );
        assert_eq!(
            msg(RegisterRequest {
                password: "12345".into(),
                ..alice()
            }),
            "Password must be between 6 and 100 characters"
        );
        assert!(validate_registration(&alice()).is_ok());
    }

    #[test]
    fn email_regex() {
        assert!(is_valid_email("a@b.co"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("a b@c.com"));
        assert!(!is_valid_email("@c.com"));
    }

    #[tokio::test]
    async fn register_issues_verifiable_token() {
        let (svc, store) = service();
        let resp = svc.register(alice()).await.unwrap();
        assert_eq!(resp.user.username, "alice");
        assert_eq!(resp.user.status, AccountStatus::Active);
        assert_eq!(resp.user.role, Role::User);
        let claims = svc.keys.verify(&resp.token).unwrap();
        assert_eq!(claims.sub, Some(resp.user.user_id));

        let stored = store.find_by_id(resp.user.user_id).await.unwrap().unwrap();
        assert_ne!(stored.password_hash, "secret1");
        assert_eq!(stored.failed_login_attempts, 0);
    }

    #[tokio::test]
    async fn duplicate_username_and_email_are_rejected() {
        let (svc, _) = service();
        svc.register(alice()).await.unwrap();

        let err = svc
            .register(RegisterRequest {
                email: "other@x.com".into(),
                ..alice()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DuplicateUsername));

        let err = svc
            .register(RegisterRequest {
                username: "alice2".into(),
                ..alice()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DuplicateEmail));
    }

    #[tokio::test]
    async fn username_lookup_is_case_sensitive() {
        let (svc, _) = service();
        svc.register(alice()).await.unwrap();
        svc.register(RegisterRequest {
            username: "Alice".into(),
            email: "Alice@x.com".into(),
            ..alice()
        })
        .await
        .expect("different case is a different account");
    }

    #[tokio::test]
    async fn login_by_username_or_email() {
        let (svc, _) = service();
        svc.register(alice()).await.unwrap();
        let a = svc.login(login("alice", "secret1")).await.unwrap();
        let b = svc.login(login("alice@x.com", "secret1")).await.unwrap();
        assert_eq!(a.user.user_id, b.user.user_id);
    }

    #[tokio::test]
    async fn unknown_user_and_wrong_password_fail_the_same_way() {
        let (svc, _) = service();
        svc.register(alice()).await.unwrap();
        let unknown = svc.login(login("mallory", "secret1")).await.unwrap_err();
        let wrong = svc.login(login("alice", "nope!!")).await.unwrap_err();
        assert!(matches!(unknown, AppError::InvalidCredentials));
        assert!(matches!(wrong, AppError::InvalidCredentials));
        assert_eq!(unknown.to_string(), wrong.to_string());
    }

    #[tokio::test]
    async fn five_failures_lock_the_account() {
        let (svc, store) = service();
        let reg = svc.register(alice()).await.unwrap();

        for _ in 0..5 {
            let err = svc.login(login("alice", "wrong-pw")).await.unwrap_err();
            assert!(matches!(err, AppError::InvalidCredentials));
        }
        let stored = store.find_by_id(reg.user.user_id).await.unwrap().unwrap();
        assert_eq!(stored.failed_login_attempts, 5);
        assert!(stored.lockout_until.is_some());

        let err = svc.login(login("alice", "secret1")).await.unwrap_err();
        assert!(matches!(err, AppError::AccountLocked));

        // locked attempts leave counters alone
        let after = store.find_by_id(reg.user.user_id).await.unwrap().unwrap();
        assert_eq!(after.failed_login_attempts, 5);
        assert_eq!(after.lockout_until, stored.lockout_until);
    }

    #[tokio::test]
    async fn expired_lockout_allows_login_and_resets() {
        let (svc, store) = service();
        let reg = svc.register(alice()).await.unwrap();
        for _ in 0..5 {
            let _ = svc.login(login("alice", "wrong-pw")).await;
        }

        let later = OffsetDateTime::now_utc() + Duration::minutes(31);
        let resp = svc.login_at(login("alice", "secret1"), later).await.unwrap();
        assert_eq!(resp.user.user_id, reg.user.user_id);

        let stored = store.find_by_id(reg.user.user_id).await.unwrap().unwrap();
        assert_eq!(stored.failed_login_attempts, 0);
        assert_eq!(stored.lockout_until, None);
    }

    #[tokio::test]
    async fn success_resets_partial_failures() {
        let (svc, store) = service();
        let reg = svc.register(alice()).await.unwrap();
        for _ in 0..3 {
            let _ = svc.login(login("alice", "wrong-pw")).await;
        }
        svc.login(login("alice", "secret1")).await.unwrap();
        let stored = store.find_by_id(reg.user.user_id).await.unwrap().unwrap();
        assert_eq!(stored.failed_login_attempts, 0);
    }

    #[tokio::test]
    async fn inactive_account_cannot_log_in() {
        let (svc, store) = service();
        let reg = svc.register(alice()).await.unwrap();
        store
            .set_status(reg.user.user_id, AccountStatus::Suspended)
            .await;

        let err = svc.login(login("alice", "secret1")).await.unwrap_err();
        assert!(matches!(err, AppError::AccountInactive));

        // wrong password still reports the generic failure first
        let err = svc.login(login("alice", "wrong-pw")).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials));

        let err = svc.current_user(reg.user.user_id).await.unwrap_err();
        assert!(matches!(err, AppError::AccountInactive));
    }

    #[tokio::test]
    async fn insert_conflict_is_reported_as_duplicate() {
        let svc = service_over(Arc::new(StaleLookups(MemoryStore::new())));
        svc.register(alice()).await.unwrap();

        let err = svc
            .register(RegisterRequest {
                email: "other@x.com".into(),
                ..alice()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DuplicateUsername));

        let err = svc
            .register(RegisterRequest {
                username: "alice2".into(),
                ..alice()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DuplicateEmail));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_registrations_yield_one_account() {
        let (svc, store) = service();
        let attempts: Vec<_> = (0..8)
            .map(|_| {
                let svc = svc.clone();
                tokio::spawn(async move { svc.register(alice()).await })
            })
            .collect();

        let mut created = 0;
        for attempt in attempts {
            match attempt.await.unwrap() {
                Ok(_) => created += 1,
                Err(AppError::DuplicateUsername) => {}
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }
        assert_eq!(created, 1);
        assert!(store.find_by_username("alice").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn blank_login_is_a_validation_error() {
        let (svc, _) = service();
        let err = svc.login(login("", "x")).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn current_user_for_unknown_subject() {
        let (svc, _) = service();
        let err = svc.current_user(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::UserNotFound));
    }
}

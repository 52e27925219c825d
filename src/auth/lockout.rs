use time::{Duration, OffsetDateTime};

use crate::{auth::repo_types::Account, config::LockoutConfig};

/// Failed-login counting and time-boxed lockout.
///
/// An account is locked exactly while `lockout_until > now`; nothing clears
/// an expired lockout except the next successful login.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockoutPolicy {
    pub threshold: u32,
    pub duration: Duration,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self {
            threshold: 5,
            duration: Duration::minutes(30),
        }
    }
}

impl From<&LockoutConfig> for LockoutPolicy {
    fn from(cfg: &LockoutConfig) -> Self {
        Self {
            threshold: cfg.threshold.max(1),
            duration: Duration::minutes(cfg.minutes),
        }
    }
}

impl LockoutPolicy {
    pub fn is_locked(&self, account: &Account, now: OffsetDateTime) -> bool {
        account.lockout_until.is_some_and(|until| until > now)
    }

    /// Wrong password on an unlocked account.
    pub fn record_failure(&self, account: &mut Account, now: OffsetDateTime) {
        account.failed_login_attempts = account.failed_login_attempts.saturating_add(1);
        if account.failed_login_attempts >= self.threshold {
            account.lockout_until = Some(now + self.duration);
        }
        account.updated_at = now;
    }

    pub fn record_success(&self, account: &mut Account, now: OffsetDateTime) {
        account.failed_login_attempts = 0;
        account.lockout_until = None;
        account.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repo_types::{AccountStatus, Role};
    use time::macros::datetime;
    use uuid::Uuid;

    fn account(now: OffsetDateTime) -> Account {
        Account {
            id: Uuid::new_v4(),
            username: "alice".into(),
            email: "alice@x.com".into(),
            password_hash: "h".into(),
            first_name: "Alice".into(),
            last_name: "A".into(),
            status: AccountStatus::Active,
            role: Role::User,
            failed_login_attempts: 0,
            lockout_until: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn fifth_failure_locks_for_thirty_minutes() {
        let now = datetime!(2024-05-01 12:00 UTC);
        let policy = LockoutPolicy::default();
        let mut acct = account(now);

        for i in 1..=4 {
            policy.record_failure(&mut acct, now);
            assert_eq!(acct.failed_login_attempts, i);
            assert!(!policy.is_locked(&acct, now));
        }
        policy.record_failure(&mut acct, now);
        assert_eq!(acct.failed_login_attempts, 5);
        assert_eq!(acct.lockout_until, Some(datetime!(2024-05-01 12:30 UTC)));
        assert!(policy.is_locked(&acct, now));
        assert!(policy.is_locked(&acct, datetime!(2024-05-01 12:29:59 UTC)));
    }

    #[test]
    fn lockout_in_the_past_is_not_locked() {
        let now = datetime!(2024-05-01 12:00 UTC);
        let policy = LockoutPolicy::default();
        let mut acct = account(now);
        acct.failed_login_attempts = 5;
        acct.lockout_until = Some(datetime!(2024-05-01 11:59 UTC));
        assert!(!policy.is_locked(&acct, now));
        // boundary: lockout_until == now is no longer locked
        acct.lockout_until = Some(now);
        assert!(!policy.is_locked(&acct, now));
    }

    #[test]
    fn success_resets_counters() {
        let now = datetime!(2024-05-01 12:00 UTC);
        let later = datetime!(2024-05-01 13:00 UTC);
        let policy = LockoutPolicy::default();
        let mut acct = account(now);
        acct.failed_login_attempts = 3;
        acct.lockout_until = Some(now);
        policy.record_success(&mut acct, later);
        assert_eq!(acct.failed_login_attempts, 0);
        assert_eq!(acct.lockout_until, None);
        assert_eq!(acct.updated_at, later);
    }

    #[test]
    fn failure_after_expired_lockout_relocks_immediately() {
        let now = datetime!(2024-05-01 12:00 UTC);
        let policy = LockoutPolicy::default();
        let mut acct = account(now);
        acct.failed_login_attempts = 5;
        acct.lockout_until = Some(datetime!(2024-05-01 11:00 UTC));
        policy.record_failure(&mut acct, now);
        assert_eq!(acct.failed_login_attempts, 6);
        assert!(policy.is_locked(&acct, now));
    }

    #[test]
    fn policy_from_config() {
        let policy = LockoutPolicy::from(&LockoutConfig {
            threshold: 3,
            minutes: 10,
        });
        assert_eq!(policy.threshold, 3);
        assert_eq!(policy.duration, Duration::minutes(10));
    }
}

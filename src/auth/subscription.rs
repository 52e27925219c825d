use std::collections::HashMap;
use std::fmt;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::warn;

use crate::{config::SubscriptionKey, error::AppError, state::AppState};

pub const SUBSCRIPTION_HEADER: &str = "x-subscription-key";

/// Why a subscription key was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionRejection {
    Required,
    InvalidKey,
    Inactive,
}

impl fmt::Display for SubscriptionRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            SubscriptionRejection::Required => "required",
            SubscriptionRejection::InvalidKey => "invalid key",
            SubscriptionRejection::Inactive => "inactive",
        };
        f.write_str(reason)
    }
}

/// Read-only registry of API subscription keys, built once from config.
#[derive(Debug, Clone)]
pub struct SubscriptionGate {
    keys: HashMap<String, SubscriptionKey>,
}

impl SubscriptionGate {
    pub fn new(keys: impl IntoIterator<Item = SubscriptionKey>) -> Self {
        Self {
            keys: keys.into_iter().map(|k| (k.key.clone(), k)).collect(),
        }
    }

    pub fn validate(&self, key: Option<&str>) -> Result<&SubscriptionKey, SubscriptionRejection> {
        let key = match key {
            Some(k) if !k.is_empty() => k,
            _ => return Err(SubscriptionRejection::Required),
        };
        let entry = self.keys.get(key).ok_or(SubscriptionRejection::InvalidKey)?;
        if !entry.active {
            return Err(SubscriptionRejection::Inactive);
        }
        Ok(entry)
    }
}

/// Router-level middleware; runs before any extractor of the wrapped routes.
pub async fn require_subscription(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let key = req
        .headers()
        .get(SUBSCRIPTION_HEADER)
        .and_then(|v| v.to_str().ok());

    match state.subscriptions.validate(key) {
        Ok(entry) => {
            tracing::debug!(
                subscription = %entry.name,
                rate_limit = entry.rate_limit,
                "subscription key accepted"
            );
            Ok(next.run(req).await)
        }
        Err(reason) => {
            warn!(%reason, uri = %req.uri(), "subscription key rejected");
            Err(AppError::Subscription(reason))
        }
    }
}

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT payload used for authentication.
///
/// Identity fields are optional so that a token lacking them still decodes;
/// callers decide what a missing field means (a missing `sub` is a rejection).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<Uuid>, // account ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>, // username
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub iat: usize, // issued at (unix timestamp)
    pub exp: usize, // expires at (unix timestamp)
    pub iss: String,
    pub aud: String,
}

impl Claims {
    pub fn subject(&self) -> Option<Uuid> {
        self.sub
    }
}

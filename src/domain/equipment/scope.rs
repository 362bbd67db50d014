// ============================================================
// HISTORY SCOPE
// ============================================================
// Partition key for dataset retention

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::error::AppError;

const GLOBAL_SCOPE_KEY: &str = "global";
const USER_SCOPE_PREFIX: &str = "user:";

/// Partition under which datasets are retained.
///
/// Anonymous uploads share the `Global` scope; authenticated uploads are kept
/// per user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Scope {
    #[default]
    Global,
    User(String),
}

impl Scope {
    pub fn user(name: impl Into<String>) -> Self {
        Scope::User(name.into())
    }

    /// Stable storage key (`global` or `user:<name>`).
    pub fn as_key(&self) -> String {
        match self {
            Scope::Global => GLOBAL_SCOPE_KEY.to_string(),
            Scope::User(name) => format!("{}{}", USER_SCOPE_PREFIX, name),
        }
    }

    /// Inverse of [`Scope::as_key`]; `None` for anything else.
    pub fn from_key(key: &str) -> Option<Self> {
        if key == GLOBAL_SCOPE_KEY {
            return Some(Scope::Global);
        }
        key.strip_prefix(USER_SCOPE_PREFIX)
            .map(|name| Scope::User(name.to_string()))
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_key())
    }
}

impl From<Scope> for String {
    fn from(scope: Scope) -> Self {
        scope.as_key()
    }
}

impl TryFrom<String> for Scope {
    type Error = AppError;

    fn try_from(key: String) -> Result<Self, Self::Error> {
        Scope::from_key(&key)
            .ok_or_else(|| AppError::ValidationError(format!("Unknown scope key '{}'", key)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_round_trip() {
        assert_eq!(Scope::Global.as_key(), "global");
        assert_eq!(Scope::user("alice").as_key(), "user:alice");
        assert_eq!(Scope::from_key("user:alice"), Some(Scope::user("alice")));
        assert_eq!(Scope::from_key("global"), Some(Scope::Global));
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        assert_eq!(Scope::from_key("Global"), None);
        assert_eq!(Scope::from_key(""), None);
        assert!(Scope::try_from("team:ops".to_string()).is_err());
    }

    #[test]
    fn test_user_named_global_does_not_collide() {
        let user = Scope::user("global");
        assert_ne!(user.as_key(), Scope::Global.as_key());
        assert_eq!(Scope::from_key(&user.as_key()), Some(user));
    }
}

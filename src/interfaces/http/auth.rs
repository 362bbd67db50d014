//! Caller scope from HTTP Basic credentials.

use std::collections::HashMap;
use std::fmt;

use base64::{engine::general_purpose, Engine as _};

use crate::domain::equipment::Scope;
use crate::infrastructure::config::AuthConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthRejection {
    Malformed,
    InvalidCredentials,
}

impl fmt::Display for AuthRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthRejection::Malformed => write!(f, "Malformed Authorization header"),
            AuthRejection::InvalidCredentials => write!(f, "Invalid credentials"),
        }
    }
}

/// Maps an `Authorization` header to the history scope it may use.
#[derive(Debug, Clone, Default)]
pub struct ScopeResolver {
    users: HashMap<String, String>,
}

impl ScopeResolver {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            users: config
                .users
                .iter()
                .map(|user| (user.username.clone(), user.password.clone()))
                .collect(),
        }
    }

    /// No header means the shared global scope.
    pub fn resolve(&self, authorization: Option<&str>) -> Result<Scope, AuthRejection> {
        let Some(header) = authorization else {
            return Ok(Scope::Global);
        };

        let (username, password) = parse_basic(header)?;
        match self.users.get(&username) {
            Some(expected) if *expected == password => Ok(Scope::user(username)),
            _ => Err(AuthRejection::InvalidCredentials),
        }
    }
}

fn parse_basic(header: &str) -> Result<(String, String), AuthRejection> {
    let (scheme, encoded) = header
        .trim()
        .split_once(' ')
        .ok_or(AuthRejection::Malformed)?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return Err(AuthRejection::Malformed);
    }

    let decoded = general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|_| AuthRejection::Malformed)?;
    let decoded = String::from_utf8(decoded).map_err(|_| AuthRejection::Malformed)?;
    let (username, password) = decoded.split_once(':').ok_or(AuthRejection::Malformed)?;

    Ok((username.to_string(), password.to_string()))
}

/// `Basic` header value for `username:password`.
pub fn basic_header(username: &str, password: &str) -> String {
    format!(
        "Basic {}",
        general_purpose::STANDARD.encode(format!("{}:{}", username, password))
    )
}

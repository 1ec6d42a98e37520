// ABOUTME: Validated service name used in instance names and labels.
// ABOUTME: Lowercase alphanumerics with inner hyphens or underscores.

use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceNameError {
    #[error("service name cannot be empty")]
    Empty,

    #[error("service name exceeds maximum length of 63 characters")]
    TooLong,

    #[error("service name must start and end with a letter or digit")]
    BadEdge,

    #[error("service name must be lowercase")]
    NotLowercase,

    #[error("invalid character in service name: '{0}'")]
    InvalidChar(char),
}

/// The short name a service is declared under (`web`, `db`).
///
/// This is the "service type" of its instances; the full service name is the
/// project-qualified form built by the instance model.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ServiceName(String);

impl ServiceName {
    pub fn new(value: &str) -> Result<Self, ServiceNameError> {
        if value.is_empty() {
            return Err(ServiceNameError::Empty);
        }
        if value.len() > 63 {
            return Err(ServiceNameError::TooLong);
        }

        let is_inner = |c: char| c == '-' || c == '_';
        if value.starts_with(is_inner) || value.ends_with(is_inner) {
            return Err(ServiceNameError::BadEdge);
        }

        if value.chars().any(|c| c.is_ascii_uppercase()) {
            return Err(ServiceNameError::NotLowercase);
        }
        if let Some(c) = value
            .chars()
            .find(|&c| !c.is_ascii_lowercase() && !c.is_ascii_digit() && !is_inner(c))
        {
            return Err(ServiceNameError::InvalidChar(c));
        }

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ServiceName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

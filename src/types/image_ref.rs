// ABOUTME: Container image reference parsing and validation.
// ABOUTME: Handles nginx, nginx:tag, registry/org/image:tag@digest.

use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseImageRefError {
    #[error("image reference cannot be empty")]
    Empty,

    #[error("invalid character in image reference: {0}")]
    InvalidChar(char),

    #[error("invalid image reference format: {0}")]
    InvalidFormat(String),
}

/// An image reference as declared.
///
/// Display returns the reference exactly as written, so run arguments and
/// fingerprints see what the user wrote rather than a normalized form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    raw: String,
    registry: Option<String>,
    name: String,
    tag: Option<String>,
    digest: Option<String>,
}

impl ImageRef {
    pub fn parse(input: &str) -> Result<Self, ParseImageRefError> {
        let raw = input.trim();
        if raw.is_empty() {
            return Err(ParseImageRefError::Empty);
        }
        if let Some(c) = raw
            .chars()
            .find(|&c| !c.is_ascii_alphanumeric() && !"/:.-_@".contains(c))
        {
            return Err(ParseImageRefError::InvalidChar(c));
        }

        let (reference, digest) = match raw.split_once('@') {
            Some((reference, digest)) if !digest.is_empty() => (reference, Some(digest)),
            Some(_) => return Err(ParseImageRefError::InvalidFormat(raw.to_string())),
            None => (raw, None),
        };

        // A colon after the last slash separates the tag; earlier colons
        // belong to a registry port.
        let last_segment = reference.rsplit('/').next().unwrap_or(reference);
        let (path, tag) = match last_segment.rsplit_once(':') {
            Some((_, tag)) => (&reference[..reference.len() - tag.len() - 1], Some(tag)),
            None => (reference, None),
        };

        let (registry, name) = match path.split_once('/') {
            Some((first, rest))
                if first.contains('.') || first.contains(':') || first == "localhost" =>
            {
                (Some(first), rest)
            }
            _ => (None, path),
        };

        if name.is_empty() || name.starts_with('/') || name.ends_with('/') {
            return Err(ParseImageRefError::InvalidFormat(raw.to_string()));
        }
        if tag.is_some_and(str::is_empty) {
            return Err(ParseImageRefError::InvalidFormat(raw.to_string()));
        }

        Ok(Self {
            raw: raw.to_string(),
            registry: registry.map(str::to_string),
            name: name.to_string(),
            tag: tag.map(str::to_string),
            digest: digest.map(str::to_string),
        })
    }

    pub fn registry(&self) -> Option<&str> {
        self.registry.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The tag, defaulting to `latest` when neither tag nor digest is given.
    pub fn tag(&self) -> Option<&str> {
        match (&self.tag, &self.digest) {
            (None, None) => Some("latest"),
            (tag, _) => tag.as_deref(),
        }
    }

    pub fn digest(&self) -> Option<&str> {
        self.digest.as_deref()
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

//! Document identity.
//!
//! A pad is addressed by a URL whose fragment reads
//! `#/w/markdown/<name>/<accessKey>`. Access keys may come as `<read>-<write>`;
//! only the read part is kept.

use crate::error::ConfigError;
use std::fmt;
use url::Url;

const MARKDOWN_PREFIX: &str = "/w/markdown/";

/// Name and access key of the one document this process serves.
#[derive(Clone, PartialEq, Eq)]
pub struct DocumentIdentity {
    name: String,
    access_key: String,
}

impl DocumentIdentity {
    /// Build an identity from its parts. Both must be non-empty.
    pub fn new(name: impl Into<String>, access_key: impl Into<String>) -> Option<Self> {
        let name = name.into();
        let access_key = access_key.into();
        if name.is_empty() || access_key.is_empty() {
            return None;
        }
        Some(Self { name, access_key })
    }

    /// Parse a pad URL, or a bare `#/w/markdown/...` fragment.
    pub fn from_url(input: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidUrl {
            url: input.to_string(),
            reason: reason.to_string(),
        };

        let fragment = match input.strip_prefix('#') {
            Some(fragment) => fragment.to_string(),
            None => {
                let url = Url::parse(input).map_err(|e| invalid(&e.to_string()))?;
                url.fragment()
                    .ok_or_else(|| invalid("missing #/w/markdown/ fragment"))?
                    .to_string()
            }
        };

        Self::from_fragment(&fragment)
            .ok_or_else(|| invalid("expected #/w/markdown/<name>/<accessKey>"))
    }

    fn from_fragment(fragment: &str) -> Option<Self> {
        let rest = fragment.strip_prefix(MARKDOWN_PREFIX)?;
        let (name, key) = rest.split_once('/')?;
        let read_key = key.split('-').next().unwrap_or_default();
        Self::new(name, read_key)
    }

    /// Document name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Encoded read key.
    pub fn access_key(&self) -> &str {
        &self.access_key
    }
}

impl fmt::Debug for DocumentIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Keys stay out of logs.
        f.debug_struct("DocumentIdentity")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

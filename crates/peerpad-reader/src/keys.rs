//! Access key decoding.

use crate::error::KeyError;

/// Decoded key material handed to the overlay.
#[derive(Clone, PartialEq, Eq)]
pub struct Keys {
    /// Key that lets us read and decrypt the document.
    pub read: Vec<u8>,
}

impl std::fmt::Debug for Keys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keys")
            .field("read_len", &self.read.len())
            .finish()
    }
}

/// Turns the URI-safe key string from a pad URL into [`Keys`].
pub trait KeyDecoder: Send + Sync {
    /// Decode `encoded`.
    fn decode(&self, encoded: &str) -> Result<Keys, KeyError>;
}

/// Read key in base58 (bitcoin alphabet), as pad URLs carry it.
///
/// Only the read part of a `<read>-<write>` pair ever reaches this decoder;
/// the write key is stripped when the URL is parsed.
#[derive(Debug, Clone, Copy, Default)]
pub struct UriKeyDecoder;

impl KeyDecoder for UriKeyDecoder {
    fn decode(&self, encoded: &str) -> Result<Keys, KeyError> {
        if encoded.is_empty() {
            return Err(KeyError::Empty);
        }
        let read = bs58::decode(encoded).into_vec()?;
        Ok(Keys { read })
    }
}

/// Encode key bytes the way [`UriKeyDecoder`] reads them.
pub fn encode_key(bytes: &[u8]) -> String {
    bs58::encode(bytes).into_string()
}

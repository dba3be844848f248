//! The set of named credentials a request ships to the oracle network.

use std::{collections::BTreeMap, fmt};

use secrecy::{ExposeSecret, SecretString};

use super::SecretsError;

/// Name of the secret holding the reasoning API key.
pub const API_KEY_SECRET: &str = "apiKey";

/// Name of the secret holding the posts API bearer token.
pub const BEARER_TOKEN_SECRET: &str = "bearerToken";

/// An immutable mapping from secret name to value.
///
/// Values are held as [`SecretString`] and never appear in `Debug` output;
/// only names do.
#[derive(Clone, Default)]
pub struct SecretBundle {
    entries: BTreeMap<String, SecretString>,
}

impl SecretBundle {
    /// Builds a bundle from name/value pairs.
    ///
    /// Names must be non-empty and unique.
    pub fn new<I, K>(entries: I) -> Result<Self, SecretsError>
    where
        I: IntoIterator<Item = (K, SecretString)>,
        K: Into<String>,
    {
        let mut map = BTreeMap::new();
        for (name, value) in entries {
            let name = name.into();
            if name.trim().is_empty() {
                return Err(SecretsError::InvalidBundle("secret name cannot be empty".into()));
            }
            if map.insert(name.clone(), value).is_some() {
                return Err(SecretsError::InvalidBundle(format!("duplicate secret '{name}'")));
            }
        }
        Ok(Self { entries: map })
    }

    /// Looks up a secret by name.
    pub fn get(&self, name: &str) -> Option<&SecretString> {
        self.entries.get(name)
    }

    /// Names of all secrets, in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Number of secrets in the bundle.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the bundle holds no secrets.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serializes the bundle to a JSON object of plaintext values.
    ///
    /// Only the encryption path calls this; the output must not be logged.
    pub(crate) fn to_plaintext_json(&self) -> Result<Vec<u8>, SecretsError> {
        let exposed: BTreeMap<&str, &str> =
            self.entries.iter().map(|(k, v)| (k.as_str(), v.expose_secret())).collect();
        Ok(serde_json::to_vec(&exposed)?)
    }

    /// Parses a JSON object of plaintext values, as produced by decryption.
    pub(crate) fn from_plaintext_json(bytes: &[u8]) -> Result<Self, SecretsError> {
        let raw: BTreeMap<String, String> = serde_json::from_slice(bytes)?;
        Self::new(raw.into_iter().map(|(k, v)| (k, SecretString::from(v))))
    }
}

impl PartialEq for SecretBundle {
    fn eq(&self, other: &Self) -> bool {
        self.entries.len() == other.entries.len()
            && self.entries.iter().zip(other.entries.iter()).all(|((ka, va), (kb, vb))| {
                ka == kb && va.expose_secret() == vb.expose_secret()
            })
    }
}

impl fmt::Debug for SecretBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretBundle").field("names", &self.entries.keys()).finish()
    }
}

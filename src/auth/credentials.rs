use crate::config::AuthConfig;
use std::fmt;
use subtle::ConstantTimeEq;

/// Keys accepted when nothing is configured, with their labels.
pub const DEFAULT_KEYS: [(&str, &str); 3] = [
    ("gestor", "gestor_estudiantes_key_2025"),
    ("android", "android_app_key_2025"),
    ("desarrollo", "desarrollo_key_2025"),
];

/// Splits a comma-separated key list, trimming entries and dropping empties.
pub fn parse_key_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CredentialSource {
    Configured,
    BuiltIn,
}

#[derive(Clone)]
pub struct Credential {
    key: String,
    label: String,
}

impl Credential {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("label", &self.label)
            .field("key", &"<redacted>")
            .finish()
    }
}

/// The keys that open protected routes. Never empty once built.
#[derive(Clone, Debug)]
pub struct CredentialSet {
    credentials: Vec<Credential>,
    source: CredentialSource,
}

impl CredentialSet {
    pub fn new(cfg: &AuthConfig) -> Self {
        Self::from_keys(cfg.allowed_keys.iter().cloned())
    }

    /// Parses a raw configuration value; `None` behaves like an unset variable.
    pub fn from_config_value(raw: Option<&str>) -> Self {
        Self::from_keys(raw.map(parse_key_list).unwrap_or_default())
    }

    /// Builds the set from already-split keys, falling back to
    /// [`DEFAULT_KEYS`] when no non-empty key remains.
    pub fn from_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let credentials: Vec<Credential> = keys
            .into_iter()
            .map(Into::<String>::into)
            .filter(|key| !key.trim().is_empty())
            .enumerate()
            .map(|(idx, key)| Credential {
                key: key.trim().to_string(),
                label: format!("key-{}", idx + 1),
            })
            .collect();

        if credentials.is_empty() {
            tracing::warn!("No API keys configured; falling back to built-in keys");
            return Self::built_in();
        }

        tracing::info!(count = credentials.len(), "API keys loaded from configuration");
        Self {
            credentials,
            source: CredentialSource::Configured,
        }
    }

    pub fn built_in() -> Self {
        Self {
            credentials: DEFAULT_KEYS
                .iter()
                .map(|(label, key)| Credential {
                    key: key.to_string(),
                    label: label.to_string(),
                })
                .collect(),
            source: CredentialSource::BuiltIn,
        }
    }

    pub fn source(&self) -> CredentialSource {
        self.source
    }

    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.credentials.iter().map(|c| c.key.as_str())
    }

    /// Exact, case-sensitive lookup. Every candidate is compared so the
    /// position of a match does not change the amount of work done.
    pub fn find(&self, presented: &str) -> Option<&Credential> {
        let mut found = None;
        for credential in &self.credentials {
            let matches: bool = credential.key.as_bytes().ct_eq(presented.as_bytes()).into();
            if matches && found.is_none() {
                found = Some(credential);
            }
        }
        found
    }
}

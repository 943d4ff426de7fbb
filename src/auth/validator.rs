use std::borrow::Cow;
use std::fmt;

use axum::http::{HeaderMap, HeaderName};
use serde::Serialize;

use super::credentials::CredentialSet;

/// Identity of a caller whose key was accepted.
#[derive(Clone, PartialEq, Eq)]
pub struct ValidatedKey {
    key: String,
    label: String,
}

impl ValidatedKey {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl fmt::Debug for ValidatedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatedKey")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RejectReason {
    Missing,
    Invalid,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::Missing => f.write_str("missing"),
            RejectReason::Invalid => f.write_str("invalid"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ValidationOutcome {
    Accepted(ValidatedKey),
    Rejected(RejectReason),
}

/// Reads the key header. `None` means the header was not sent at all.
///
/// Values that are not valid UTF-8 are decoded lossily; they can never equal
/// a configured key, so they end up rejected as invalid rather than missing.
pub fn extract_key<'a>(headers: &'a HeaderMap, header_name: &HeaderName) -> Option<Cow<'a, str>> {
    headers
        .get(header_name)
        .map(|value| String::from_utf8_lossy(value.as_bytes()))
}

impl CredentialSet {
    pub fn validate(&self, presented: Option<&str>) -> ValidationOutcome {
        let key = match presented {
            Some(k) if !k.is_empty() => k,
            _ => return ValidationOutcome::Rejected(RejectReason::Missing),
        };

        match self.find(key) {
            Some(credential) => ValidationOutcome::Accepted(ValidatedKey {
                key: credential.key().to_string(),
                label: credential.label().to_string(),
            }),
            None => ValidationOutcome::Rejected(RejectReason::Invalid),
        }
    }

    pub fn validate_headers(
        &self,
        headers: &HeaderMap,
        header_name: &HeaderName,
    ) -> ValidationOutcome {
        let presented = extract_key(headers, header_name);
        self.validate(presented.as_deref())
    }
}

//! API key gate for protected routes.
//!
//! A [`CredentialSet`] is built once at startup, [`extract_key`] pulls the
//! presented key out of a request, [`CredentialSet::validate`] decides, and
//! [`require_api_key`] wires the decision into the router.

mod credentials;
mod guard;
mod validator;

pub use credentials::{parse_key_list, Credential, CredentialSet, CredentialSource, DEFAULT_KEYS};
pub use guard::{require_api_key, GuardState, WWW_AUTHENTICATE_SCHEME};
pub use validator::{extract_key, RejectReason, ValidatedKey, ValidationOutcome};

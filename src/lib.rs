pub mod auth;
pub mod config;
pub mod error;
pub mod estudiantes;
pub mod http;

pub use auth::{CredentialSet, RejectReason, ValidatedKey, ValidationOutcome};
pub use config::AppConfig;
pub use error::{ApiError, Result};
pub use estudiantes::EstudianteStore;
pub use http::{build_router, AppState};

pub mod auth;
pub mod comparator;
pub mod config;
pub mod document;
pub mod engine;
pub mod enumeration;
pub mod error;
pub mod fixtures;
pub mod models;
pub mod payloads;
pub mod rate_limit;
pub mod reporting;
pub mod response_analysis;
pub mod suite;
pub mod verdict;

// Re-export commonly used items
pub use auth::{AuthStrategy, HeaderProfile, NoAuth, TokenAuth, TokenScheme};
pub use comparator::{compare_responses, compare_with_and_without_auth, Comparison};
pub use config::{SuiteConfig, SuiteKind};
pub use document::{get_field, mutate_field, remove_field, Document, FieldPath, MutationError};
pub use engine::{ProbeClient, ProbeResponse};
pub use error::{Mismatch, ProbeError};
pub use fixtures::{FixtureError, Fixtures};
pub use models::{Endpoint, Method, ProbeRequest};
pub use reporting::{ProbeRecord, ResultCollector, Summary};
pub use verdict::Verdict;

//! Application layer (use-cases, policies).
//!
//! This module orchestrates domain logic: the controller, session
//! persistence, preset storage and generation requests. It talks to the
//! outside world only through the traits in `infra`.

pub mod controller;
pub mod generated;
pub mod git_context;
pub mod presets;
pub mod repo_config;
pub mod request;
pub mod session;

pub use controller::{Controller, GenerationOutcome};
pub use request::{GenerationRequest, Separator};
pub use session::{Session, default_session_path};

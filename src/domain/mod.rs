//! Domain types for pr-builder
//! Defines the curated pull-request state and the rules that govern it.

pub mod context;
pub mod error;
pub mod file;
pub mod filter;
pub mod preset;
pub mod state;
pub mod tokens;

pub use context::*;
pub use error::*;
pub use file::*;
pub use filter::*;
pub use preset::*;
pub use state::*;

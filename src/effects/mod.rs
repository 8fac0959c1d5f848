//! Effects-as-data for release API operations.
//!
//! The deploy pipeline describes each remote call as a `ReleaseEffect` and
//! hands it to a `ReleaseInterpreter`. This keeps the pipeline free of HTTP
//! details and lets tests observe exactly which calls were made, in order.

pub mod interpreter;
pub mod release;

pub use interpreter::ReleaseInterpreter;
pub use release::{AssetBytes, ReleaseEffect, ReleaseResponse};

//! Clients and utilities for the external services the pipeline consumes.
//!
//! Includes:
//! - `auth`: token lifecycle against the pollution API's auth endpoints.
//! - `rate_limit`: the shared sliding-window request budget.
//! - `pollu`: health-checked, paginated retrieval of pollution rows.
//! - `wiki`: the encyclopedic summary lookup behind the city realness gate.

mod auth;
mod pollu;
mod rate_limit;
mod wiki;


pub use auth::*;
pub use pollu::*;
pub use rate_limit::*;
pub use wiki::*;

//! Multi-stage authentication middleware composition for axum.
//!
//! Wraps an ordered list of authentication strategies so a multi-step login
//! (e.g. password then second factor) can span several HTTP round-trips:
//! each request re-enters the chain, fast-forwards through stages the
//! session has already passed, and runs the first one it has not. Protected
//! routes sit behind a terminal gate that redirects until every stage is
//! complete, capturing the original URL for replay after login.
//!
//! Strategies and session storage are collaborators, not part of this
//! crate: strategies implement [`Strategy`], sessions come from
//! `tower-sessions`.

pub mod config;
pub mod error;
pub mod middleware;
pub mod session;
pub mod strategy;

pub use config::Config;
pub use error::{StageError, StageResult};
pub use middleware::{stage_layers, AuthGate, LoginRedirect, StageCoordinator, StageMiddleware};
pub use session::StageSession;
pub use strategy::{ArcStrategy, Strategy};

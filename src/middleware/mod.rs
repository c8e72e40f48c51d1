//! Middleware: the stage coordinator, composed chain, and terminal gates.

pub mod stage;

pub use stage::{stage_layers, AuthGate, LoginRedirect, StageCoordinator, StageMiddleware};

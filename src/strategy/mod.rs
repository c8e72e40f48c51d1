//! Strategy contract: one authentication step per strategy.
//!
//! Strategies are supplied by the application. This crate never implements
//! one; it only sequences them and tracks how far a session has progressed.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;

use crate::session::StageSession;

/// One authentication step. Implementations may call `next.run` to signal
/// the step passed, respond directly (e.g. render a challenge or reject),
/// or fail however they choose; this crate does not interpret or transform
/// their responses.
///
/// A strategy that completes a login should record the principal with
/// [`StageSession::set_user`] so the terminal gates see the session as
/// authenticated.
#[async_trait]
pub trait Strategy: Send + Sync + 'static {
    async fn authenticate(&self, session: StageSession, request: Request, next: Next) -> Response;
}

/// Shared handle to a strategy, as stored in the composed chain.
pub type ArcStrategy = Arc<dyn Strategy>;

/// Plain async functions and closures are strategies too.
#[async_trait]
impl<F, Fut> Strategy for F
where
    F: Fn(StageSession, Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    async fn authenticate(&self, session: StageSession, request: Request, next: Next) -> Response {
        self(session, request, next).await
    }
}

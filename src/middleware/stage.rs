//! Stage coordinator: wraps an ordered list of authentication strategies so
//! a multi-step login can span several requests, with progress tracked in
//! the session.

use std::sync::Arc;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Router;
use tower_sessions::Session;
use tracing::debug;

use crate::config::Config;
use crate::error::{StageError, StageResult};
use crate::session::StageSession;
use crate::strategy::ArcStrategy;

/// Sequences authentication strategies and gates protected routes on the
/// session's progress through them.
///
/// Lifecycle: construct with a [`Config`], call [`compose`](Self::compose)
/// once with the ordered strategies, then install the returned chain and
/// the gates. The gates bind the terminal stage count when they are built,
/// so requesting one before `compose` fails with
/// [`StageError::NotComposed`].
pub struct StageCoordinator {
    config: Arc<Config>,
    strategy_count: Option<usize>,
}

impl StageCoordinator {
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
            strategy_count: None,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// View a request session through this coordinator's configured keys.
    pub fn stage_session(&self, session: Session) -> StageSession {
        StageSession::new(session, self.config.clone())
    }

    /// Stored stage for the session, 0 if none attempted.
    pub async fn authentication_stage(&self, session: Session) -> StageResult<usize> {
        self.stage_session(session).stage().await
    }

    /// Wrap the ordered strategies into a middleware chain: one wrapper per
    /// strategy plus a terminal wrapper that only stamps the final stage
    /// and passes control onward. Install the chain in order with
    /// [`stage_layers`].
    ///
    /// Errors with [`StageError::NoStrategies`] when called with an empty
    /// list.
    pub fn compose(&mut self, strategies: Vec<ArcStrategy>) -> StageResult<Vec<StageMiddleware>> {
        if strategies.is_empty() {
            return Err(StageError::NoStrategies);
        }
        self.strategy_count = Some(strategies.len());

        let mut chain: Vec<StageMiddleware> = strategies
            .into_iter()
            .enumerate()
            .map(|(stage, strategy)| StageMiddleware {
                config: self.config.clone(),
                stage,
                kind: StageKind::Strategy(strategy),
            })
            .collect();
        chain.push(StageMiddleware {
            config: self.config.clone(),
            stage: chain.len(),
            kind: StageKind::Terminal,
        });
        Ok(chain)
    }

    /// Terminal gate for protected routes: passes the request through only
    /// when the session is authenticated at the terminal stage, otherwise
    /// captures the request URL and redirects to `failure_redirect`.
    pub fn require_authenticated(&self) -> StageResult<AuthGate> {
        Ok(AuthGate {
            config: self.config.clone(),
            terminal_stage: self.terminal_stage()?,
        })
    }

    /// Post-login redirect middleware: sends fully authenticated sessions
    /// to their success target and lets everything else continue down the
    /// chain (e.g. to render the next login stage's form).
    pub fn login_redirect(&self) -> StageResult<LoginRedirect> {
        Ok(LoginRedirect {
            config: self.config.clone(),
            terminal_stage: self.terminal_stage()?,
        })
    }

    fn terminal_stage(&self) -> StageResult<usize> {
        self.strategy_count.ok_or(StageError::NotComposed)
    }
}

#[derive(Clone)]
enum StageKind {
    Strategy(ArcStrategy),
    Terminal,
}

/// One stage of a composed chain: a wrapped strategy, or the terminal
/// sentinel appended after the last one.
#[derive(Clone)]
pub struct StageMiddleware {
    config: Arc<Config>,
    stage: usize,
    kind: StageKind,
}

impl StageMiddleware {
    /// Position of this wrapper in the chain. The terminal sentinel sits at
    /// stage N for N strategies.
    pub fn stage(&self) -> usize {
        self.stage
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.kind, StageKind::Terminal)
    }

    pub async fn handle(&self, session: Session, request: Request, next: Next) -> Response {
        let session = StageSession::new(session, self.config.clone());
        match self.run(session, request, next).await {
            Ok(response) => response,
            Err(err) => err.into_response(),
        }
    }

    async fn run(
        &self,
        session: StageSession,
        request: Request,
        next: Next,
    ) -> StageResult<Response> {
        let current = session.stage().await?;
        if current > self.stage {
            // Already passed on a prior request; strictly greater, so a
            // stage that failed without authenticating runs again.
            debug!(stage = self.stage, "skipping stage");
            return Ok(next.run(request).await);
        }

        debug!(stage = self.stage, "authentication stage");
        // Forward-marking, not a success marker: written before the
        // strategy runs, and even if it then fails.
        session.set_stage(self.stage).await?;
        match &self.kind {
            StageKind::Strategy(strategy) => {
                Ok(strategy.authenticate(session, request, next).await)
            }
            StageKind::Terminal => Ok(next.run(request).await),
        }
    }
}

/// Apply a composed chain to a router, stage 0 outermost so strategies run
/// in composition order.
pub fn stage_layers<S>(router: Router<S>, stages: Vec<StageMiddleware>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let mut router = router;
    for stage in stages.into_iter().rev() {
        router = router.layer(axum::middleware::from_fn(
            move |session: Session, request: Request, next: Next| {
                let stage = stage.clone();
                async move { stage.handle(session, request, next).await }
            },
        ));
    }
    router
}

/// Terminal gate built by [`StageCoordinator::require_authenticated`].
#[derive(Clone)]
pub struct AuthGate {
    config: Arc<Config>,
    terminal_stage: usize,
}

impl AuthGate {
    pub async fn handle(&self, session: Session, request: Request, next: Next) -> Response {
        let session = StageSession::new(session, self.config.clone());
        match self.run(session, request, next).await {
            Ok(response) => response,
            Err(err) => err.into_response(),
        }
    }

    async fn run(
        &self,
        session: StageSession,
        request: Request,
        next: Next,
    ) -> StageResult<Response> {
        if is_authenticated_stage(&session, self.terminal_stage).await? {
            debug!(stage = self.terminal_stage, "authenticated");
            return Ok(next.run(request).await);
        }

        debug!(stage = self.terminal_stage, "not authenticated");
        session.capture_redirect(&request.uri().to_string()).await?;
        Ok(Redirect::to(&self.config.failure_redirect).into_response())
    }

    /// Wrap every route in `router` behind this gate.
    pub fn apply<S>(self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        router.layer(axum::middleware::from_fn(
            move |session: Session, request: Request, next: Next| {
                let gate = self.clone();
                async move { gate.handle(session, request, next).await }
            },
        ))
    }
}

/// Post-login redirect middleware built by
/// [`StageCoordinator::login_redirect`].
#[derive(Clone)]
pub struct LoginRedirect {
    config: Arc<Config>,
    terminal_stage: usize,
}

impl LoginRedirect {
    pub async fn handle(&self, session: Session, request: Request, next: Next) -> Response {
        let session = StageSession::new(session, self.config.clone());
        match self.run(session, request, next).await {
            Ok(response) => response,
            Err(err) => err.into_response(),
        }
    }

    async fn run(
        &self,
        session: StageSession,
        request: Request,
        next: Next,
    ) -> StageResult<Response> {
        if !is_authenticated_stage(&session, self.terminal_stage).await? {
            return Ok(next.run(request).await);
        }

        // The captured URL is consumed either way; it only picks the target
        // when return-to behavior is configured.
        let captured = session.take_captured_redirect().await?;
        let target = match &self.config.success_return_to_or_redirect {
            Some(fallback) => captured.unwrap_or_else(|| fallback.clone()),
            None => self.config.success_redirect.clone(),
        };
        debug!(target = %target, "login redirect");
        Ok(Redirect::to(&target).into_response())
    }

    pub fn apply<S>(self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        router.layer(axum::middleware::from_fn(
            move |session: Session, request: Request, next: Next| {
                let redirect = self.clone();
                async move { redirect.handle(session, request, next).await }
            },
        ))
    }
}

async fn is_authenticated_stage(session: &StageSession, stage: usize) -> StageResult<bool> {
    Ok(session.is_authenticated().await? && session.stage().await? >= stage)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pass_through() -> ArcStrategy {
        Arc::new(
            |_session: StageSession, request: Request, next: Next| async move {
                next.run(request).await
            },
        )
    }

    #[test]
    fn compose_requires_at_least_one_strategy() {
        let mut coordinator = StageCoordinator::new(Config::default());
        assert!(matches!(
            coordinator.compose(vec![]),
            Err(StageError::NoStrategies)
        ));
    }

    #[test]
    fn compose_returns_one_wrapper_per_strategy_plus_terminal() {
        let mut coordinator = StageCoordinator::new(Config::default());
        let chain = coordinator
            .compose(vec![pass_through(), pass_through()])
            .unwrap();
        assert_eq!(chain.len(), 3);
        assert_eq!(
            chain.iter().map(StageMiddleware::stage).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
        assert!(!chain[0].is_terminal());
        assert!(!chain[1].is_terminal());
        assert!(chain[2].is_terminal());
    }

    #[test]
    fn gates_fail_before_compose() {
        let coordinator = StageCoordinator::new(Config::default());
        assert!(matches!(
            coordinator.require_authenticated(),
            Err(StageError::NotComposed)
        ));
        assert!(matches!(
            coordinator.login_redirect(),
            Err(StageError::NotComposed)
        ));
    }

    #[test]
    fn gates_bind_terminal_stage_after_compose() {
        let mut coordinator = StageCoordinator::new(Config::default());
        coordinator.compose(vec![pass_through()]).unwrap();
        let gate = coordinator.require_authenticated().unwrap();
        assert_eq!(gate.terminal_stage, 1);
        let redirect = coordinator.login_redirect().unwrap();
        assert_eq!(redirect.terminal_stage, 1);
    }
}

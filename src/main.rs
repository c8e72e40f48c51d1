//! Entry point: demo server wiring a two-stage login through the
//! coordinator. Credentials are fixed request headers; real applications
//! supply their own strategies.

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::Request;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use stagegate::{stage_layers, Config, StageCoordinator, StageSession, Strategy};
use tower_http::trace::TraceLayer;
use tower_sessions::{MemoryStore, SessionManagerLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Demo strategy: checks one request header against a fixed credential.
/// The last stage records the principal so the gates see the session as
/// authenticated.
struct HeaderCredential {
    header: &'static str,
    expected: String,
    principal: Option<&'static str>,
}

#[async_trait]
impl Strategy for HeaderCredential {
    async fn authenticate(&self, session: StageSession, request: Request, next: Next) -> Response {
        let supplied = request
            .headers()
            .get(self.header)
            .and_then(|v| v.to_str().ok());
        if supplied != Some(self.expected.as_str()) {
            return (
                StatusCode::UNAUTHORIZED,
                format!("{} required\n", self.header),
            )
                .into_response();
        }
        if let Some(principal) = self.principal {
            if let Err(err) = session.set_user(principal).await {
                return err.into_response();
            }
        }
        next.run(request).await
    }
}

async fn home() -> &'static str {
    "stagegate demo; try /protected\n"
}

async fn login_form() -> &'static str {
    "POST /authenticate with x-password, then again with x-pin\n"
}

async fn authenticate_fallback() -> (StatusCode, &'static str) {
    (StatusCode::UNAUTHORIZED, "further authentication required\n")
}

async fn protected() -> &'static str {
    "fully authenticated\n"
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let password = std::env::var("DEMO_PASSWORD").unwrap_or_else(|_| "hunter2".to_string());
    let pin = std::env::var("DEMO_PIN").unwrap_or_else(|_| "0000".to_string());

    let mut coordinator = StageCoordinator::new(Config::from_env());
    let chain = coordinator.compose(vec![
        Arc::new(HeaderCredential {
            header: "x-password",
            expected: password,
            principal: None,
        }),
        Arc::new(HeaderCredential {
            header: "x-pin",
            expected: pin,
            principal: Some("demo"),
        }),
    ])?;

    tracing::info!(
        failure_redirect = %coordinator.config().failure_redirect,
        success_redirect = %coordinator.config().success_redirect,
        "stage coordinator ready"
    );

    // POST /authenticate runs the chain; once fully authenticated the
    // login redirect fires before the fallback handler.
    let authenticate = Router::new().route("/authenticate", post(authenticate_fallback));
    let authenticate = coordinator.login_redirect()?.apply(authenticate);
    let authenticate = stage_layers(authenticate, chain);

    let login = coordinator
        .login_redirect()?
        .apply(Router::new().route("/login", get(login_form)));
    let protected_routes = coordinator
        .require_authenticated()?
        .apply(Router::new().route("/protected", get(protected)));

    let session_layer = SessionManagerLayer::new(MemoryStore::default()).with_secure(false);

    let app = Router::new()
        .route("/", get(home))
        .merge(authenticate)
        .merge(login)
        .merge(protected_routes)
        .layer(session_layer)
        .layer(TraceLayer::new_for_http());

    let addr = std::env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    tracing::info!(addr = %addr, "listening");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

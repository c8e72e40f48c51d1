//! Typed accessors over the request session.
//!
//! The session store itself is externally owned (`tower-sessions`); this
//! wrapper is the only place the crate touches it, and it reads/writes just
//! three keys: the stage counter, the logged-in principal, and the captured
//! login-redirect URL.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tower_sessions::Session;

use crate::config::Config;
use crate::error::StageResult;

/// A request session viewed through the coordinator's configured keys.
#[derive(Clone)]
pub struct StageSession {
    session: Session,
    config: Arc<Config>,
}

impl StageSession {
    pub fn new(session: Session, config: Arc<Config>) -> Self {
        Self { session, config }
    }

    /// The underlying `tower-sessions` session, for strategies that keep
    /// state of their own.
    pub fn inner(&self) -> &Session {
        &self.session
    }

    /// How many authentication stages this session has progressed through.
    /// 0 if none attempted.
    pub async fn stage(&self) -> StageResult<usize> {
        let stage = self
            .session
            .get::<usize>(&self.config.session_stage_field)
            .await?;
        Ok(stage.unwrap_or(0))
    }

    pub async fn set_stage(&self, stage: usize) -> StageResult<()> {
        self.session
            .insert(&self.config.session_stage_field, stage)
            .await?;
        Ok(())
    }

    /// Record the logged-in principal. A strategy calls this when its step
    /// completes a login; presence of the principal is what the terminal
    /// gates treat as "authenticated".
    pub async fn set_user(&self, user: impl Serialize) -> StageResult<()> {
        self.session
            .insert(&self.config.session_user_field, user)
            .await?;
        Ok(())
    }

    pub async fn user<T: DeserializeOwned>(&self) -> StageResult<Option<T>> {
        let user = self.session.get::<T>(&self.config.session_user_field).await?;
        Ok(user)
    }

    pub async fn is_authenticated(&self) -> StageResult<bool> {
        let user = self
            .session
            .get::<serde_json::Value>(&self.config.session_user_field)
            .await?;
        Ok(user.is_some())
    }

    pub async fn captured_redirect(&self) -> StageResult<Option<String>> {
        let url = self
            .session
            .get::<String>(&self.config.session_login_redirect_field)
            .await?;
        Ok(url)
    }

    /// Capture a URL for replay after login. First write wins; repeated
    /// captures do not overwrite an existing URL.
    pub async fn capture_redirect(&self, url: &str) -> StageResult<()> {
        if self.captured_redirect().await?.is_none() {
            self.session
                .insert(&self.config.session_login_redirect_field, url)
                .await?;
        }
        Ok(())
    }

    /// Remove and return the captured URL, if any.
    pub async fn take_captured_redirect(&self) -> StageResult<Option<String>> {
        let url = self
            .session
            .remove::<String>(&self.config.session_login_redirect_field)
            .await?;
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tower_sessions::MemoryStore;

    fn stage_session() -> StageSession {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        StageSession::new(session, Arc::new(Config::default()))
    }

    #[tokio::test]
    async fn stage_defaults_to_zero() {
        let session = stage_session();
        assert_eq!(session.stage().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn stage_round_trips() {
        let session = stage_session();
        session.set_stage(2).await.unwrap();
        assert_eq!(session.stage().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn unauthenticated_until_user_is_set() {
        let session = stage_session();
        assert!(!session.is_authenticated().await.unwrap());
        session.set_user("alice").await.unwrap();
        assert!(session.is_authenticated().await.unwrap());
        assert_eq!(
            session.user::<String>().await.unwrap().as_deref(),
            Some("alice")
        );
    }

    #[tokio::test]
    async fn capture_redirect_first_write_wins() {
        let session = stage_session();
        session.capture_redirect("/first").await.unwrap();
        session.capture_redirect("/second").await.unwrap();
        assert_eq!(
            session.captured_redirect().await.unwrap().as_deref(),
            Some("/first")
        );
    }

    #[tokio::test]
    async fn take_captured_redirect_removes_the_url() {
        let session = stage_session();
        session.capture_redirect("/deep/link").await.unwrap();
        assert_eq!(
            session.take_captured_redirect().await.unwrap().as_deref(),
            Some("/deep/link")
        );
        assert_eq!(session.captured_redirect().await.unwrap(), None);
    }
}

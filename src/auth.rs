// Auth flow over the gateway, with session state persisted through the
// injected session store (token and user metadata under fixed keys, all
// cleared together on logout).

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{info, warn};

use crate::gateway::{AuthResponse, Gateway, GatewayError};
use crate::session::{
    SessionError, SessionStore, KEY_AUTH_TOKEN, KEY_LOGGED_IN_AT, KEY_USER_DISPLAY_NAME,
    KEY_USER_EMAIL, KEY_USER_ID, SESSION_KEYS,
};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Session(#[from] SessionError),
}

/// The signed-in user as far as the client knows.
#[derive(Debug, Clone, PartialEq)]
pub struct UserProfile {
    pub user_id: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

/// Auth orchestration: login/signup/verify against the gateway plus session
/// persistence. Holds no mutable state of its own; the session store is the
/// record.
pub struct AuthSession {
    gateway: Arc<dyn Gateway>,
    store: Arc<dyn SessionStore>,
}

impl AuthSession {
    pub fn new(gateway: Arc<dyn Gateway>, store: Arc<dyn SessionStore>) -> Self {
        AuthSession { gateway, store }
    }

    /// Log in and persist the session. Returns the signed-in profile and the
    /// token (callers attach it to the gateway).
    pub async fn login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(UserProfile, String), AuthError> {
        let resp = self.gateway.login(email, password).await?;
        self.persist(&resp)?;
        info!(user_id = %resp.user_id, "logged in");
        Ok((profile_from(&resp), resp.token))
    }

    /// Create an account and persist the resulting session.
    pub async fn signup(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<(UserProfile, String), AuthError> {
        let resp = self.gateway.signup(email, password, display_name).await?;
        self.persist(&resp)?;
        info!(user_id = %resp.user_id, "account created");
        Ok((profile_from(&resp), resp.token))
    }

    /// Restore a previous session from the store, verifying the stored token
    /// with the gateway. An invalid or rejected token clears the session.
    pub async fn restore(&self) -> Result<Option<(UserProfile, String)>, AuthError> {
        let token = match self.store.get(KEY_AUTH_TOKEN)? {
            Some(t) => t,
            None => return Ok(None),
        };

        match self.gateway.verify_token(&token).await {
            Ok(user) => {
                let profile = UserProfile {
                    user_id: user.user_id,
                    email: user.email,
                    display_name: user.display_name,
                };
                info!(user_id = %profile.user_id, "session restored");
                Ok(Some((profile, token)))
            }
            Err(e) => {
                warn!("stored token rejected, clearing session: {e}");
                self.logout()?;
                Ok(None)
            }
        }
    }

    /// Clear every session key together.
    pub fn logout(&self) -> Result<(), AuthError> {
        for key in SESSION_KEYS {
            self.store.clear(key)?;
        }
        Ok(())
    }

    fn persist(&self, resp: &AuthResponse) -> Result<(), SessionError> {
        self.store.set(KEY_AUTH_TOKEN, &resp.token)?;
        self.store.set(KEY_USER_ID, &resp.user_id)?;
        if let Some(ref email) = resp.email {
            self.store.set(KEY_USER_EMAIL, email)?;
        }
        if let Some(ref name) = resp.display_name {
            self.store.set(KEY_USER_DISPLAY_NAME, name)?;
        }
        self.store.set(KEY_LOGGED_IN_AT, &Utc::now().to_rfc3339())?;
        Ok(())
    }
}

fn profile_from(resp: &AuthResponse) -> UserProfile {
    UserProfile {
        user_id: resp.user_id.clone(),
        email: resp.email.clone(),
        display_name: resp.display_name.clone(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

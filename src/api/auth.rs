//! Token lifecycle management for the pollution API.
//!
//! The manager owns no hidden state: it reads the current `AuthSession` from
//! the shared cache, decides freshness as a pure function of `(session, now)`,
//! and performs refresh/login calls as needed, persisting the outcome. Refresh
//! failure falls through to a full login; login failure is fatal to the cycle.

use crate::cache::Cache;
use crate::config::AppConfig;
use crate::error::{AppError, Result};
use crate::models::{AuthSession, LoginResponse, RefreshResponse};
use chrono::Utc;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};

const AUTH_CACHE_KEY: &str = "pollu_api:auth";

/// Access-token lifetime assumed when the auth endpoints omit `expiresIn`.
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 900;

/// True while the session's access token is usable, with `skew_secs` of
/// safety margin before the recorded expiry.
pub fn session_is_fresh(session: &AuthSession, now_epoch: i64, skew_secs: i64) -> bool {
    !session.access_token.is_empty() && now_epoch + skew_secs < session.access_expires_at
}

/// Acquires and refreshes bearer credentials against `/auth/login` and
/// `/auth/refresh`, persisting the session in the shared cache.
pub struct AuthTokenManager {
    http: Client,
    cache: Cache,
    api_base: String,
    username: String,
    password: String,
    auth_ttl: Duration,
    token_skew_secs: i64,
}

impl AuthTokenManager {
    pub fn new(http: Client, cache: Cache, config: &AppConfig) -> Self {
        Self {
            http,
            cache,
            api_base: config.api_base.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
            auth_ttl: config.auth_ttl,
            token_skew_secs: config.token_skew_secs,
        }
    }

    /// Returns a session whose access token is valid for at least the skew
    /// margin, reusing the cached one when possible.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Auth` if a full login is needed and rejected.
    pub async fn ensure_valid_token(&self) -> Result<AuthSession> {
        let cached: Option<AuthSession> = self.cache.read_json(AUTH_CACHE_KEY);

        if let Some(session) = &cached {
            if session_is_fresh(session, Utc::now().timestamp(), self.token_skew_secs) {
                return Ok(session.clone());
            }
        }

        // Try refresh first if we have a refresh token; failure falls
        // through to a fresh login.
        if let Some(session) = &cached {
            if !session.refresh_token.is_empty() {
                if let Some(refreshed) = self.refresh(&session.refresh_token).await {
                    self.persist(&refreshed);
                    return Ok(refreshed);
                }
            }
        }

        let session = self.login().await?;
        self.persist(&session);
        Ok(session)
    }

    /// Unconditionally renews credentials; called after observing a 401 from
    /// a protected endpoint.
    pub async fn force_refresh(&self) -> Result<AuthSession> {
        let cached: Option<AuthSession> = self.cache.read_json(AUTH_CACHE_KEY);

        if let Some(session) = &cached {
            if !session.refresh_token.is_empty() {
                if let Some(refreshed) = self.refresh(&session.refresh_token).await {
                    self.persist(&refreshed);
                    return Ok(refreshed);
                }
            }
        }

        let session = self.login().await?;
        self.persist(&session);
        Ok(session)
    }

    async fn login(&self) -> Result<AuthSession> {
        debug!("Logging in to pollution API");
        let url = format!("{}/auth/login", self.api_base);

        let response = self
            .http
            .post(&url)
            .json(&json!({ "username": self.username, "password": self.password }))
            .send()
            .await
            .map_err(|e| AppError::Auth(format!("login transport failure: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Auth(format!("login failed (status={})", status)));
        }

        let body: LoginResponse = response
            .json()
            .await
            .map_err(|e| AppError::Auth(format!("login returned invalid body: {}", e)))?;

        let lifetime = body.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS);
        Ok(AuthSession {
            access_token: body.token,
            refresh_token: body.refresh_token,
            access_expires_at: Utc::now().timestamp() + lifetime,
        })
    }

    /// Soft-failure refresh: any transport, status or parse problem yields
    /// `None` and the caller falls back to login. Keeps the existing refresh
    /// token, as `/auth/refresh` only rotates the access token.
    async fn refresh(&self, refresh_token: &str) -> Option<AuthSession> {
        debug!("Refreshing pollution API access token");
        let url = format!("{}/auth/refresh", self.api_base);

        let response = self
            .http
            .post(&url)
            .json(&json!({ "refreshToken": refresh_token }))
            .send()
            .await
            .map_err(|e| warn!("Token refresh transport failure: {}", e))
            .ok()?;

        if !response.status().is_success() {
            warn!("Token refresh rejected (status={})", response.status());
            return None;
        }

        let body: RefreshResponse = response
            .json()
            .await
            .map_err(|e| warn!("Token refresh returned invalid body: {}", e))
            .ok()?;

        let lifetime = body.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS);
        Some(AuthSession {
            access_token: body.access_token,
            refresh_token: refresh_token.to_string(),
            access_expires_at: Utc::now().timestamp() + lifetime,
        })
    }

    fn persist(&self, session: &AuthSession) {
        self.cache.write_json(AUTH_CACHE_KEY, session, self.auth_ttl);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(expires_at: i64) -> AuthSession {
        AuthSession {
            access_token: "tok".to_string(),
            refresh_token: "ref".to_string(),
            access_expires_at: expires_at,
        }
    }

    #[test]
    fn fresh_strictly_before_skew_boundary() {
        let s = session(1_000);
        assert!(session_is_fresh(&s, 969, 30));
    }

    #[test]
    fn stale_at_skew_boundary() {
        let s = session(1_000);
        assert!(!session_is_fresh(&s, 970, 30));
    }

    #[test]
    fn stale_after_expiry() {
        let s = session(1_000);
        assert!(!session_is_fresh(&s, 1_001, 30));
    }

    #[test]
    fn empty_access_token_is_never_fresh() {
        let mut s = session(i64::MAX - 100);
        s.access_token.clear();
        assert!(!session_is_fresh(&s, 0, 30));
    }
}

use std::{net::SocketAddr, num::NonZeroU32, time::Duration};

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, SignedCookieJar};
use cookie::SameSite;
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use serde::{Deserialize, Serialize};

use crate::{
    AppState,
    config::{Config, MAX_SESSION_TTL_MINUTES},
};

pub const SESSION_COOKIE: &str = "cinema_session";

/// Per-visitor state carried in a signed cookie.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Session {
    /// Unix second at which the admin login lapses. `None` when logged out.
    #[serde(default)]
    pub admin_until: Option<i64>,
    #[serde(default)]
    pub teacher_verified: bool,
    /// Set once the visitor has accepted the booking terms.
    #[serde(default)]
    pub consented: bool,
}

impl Session {
    pub fn from_jar(jar: &SignedCookieJar) -> Self {
        jar.get(SESSION_COOKIE)
            .and_then(|c| serde_json::from_str(c.value()).ok())
            .unwrap_or_default()
    }

    pub fn is_admin(&self, now: i64) -> bool {
        self.admin_until.is_some_and(|until| now < until)
    }

    pub fn with_admin(self, now: i64, ttl_minutes: i64) -> Self {
        let until = now.saturating_add(ttl_minutes.saturating_mul(60));
        Self { admin_until: Some(until), ..self }
    }

    pub fn without_admin(self) -> Self {
        Self { admin_until: None, ..self }
    }

    pub fn with_teacher(self) -> Self {
        Self { teacher_verified: true, ..self }
    }

    pub fn without_teacher(self) -> Self {
        Self { teacher_verified: false, ..self }
    }

    pub fn with_consent(self) -> Self {
        Self { consented: true, ..self }
    }

    pub fn store(&self, jar: SignedCookieJar, config: &Config) -> SignedCookieJar {
        if *self == Session::default() {
            return jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
        }
        let value = serde_json::to_string(self).unwrap_or_default();
        let cookie = Cookie::build((SESSION_COOKIE, value))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .max_age(time::Duration::minutes(
                config.session_ttl_minutes.clamp(0, MAX_SESSION_TTL_MINUTES),
            ));
        jar.add(cookie)
    }
}

/// Extracts a session that holds a live admin login, redirecting to the login page otherwise.
pub struct AdminSession(pub Session);

impl FromRequestParts<AppState> for AdminSession {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = SignedCookieJar::from_request_parts(parts, state)
            .await
            .map_err(|never| match never {})?;
        let session = Session::from_jar(&jar);
        if session.is_admin(crate::store::now_sec()) {
            Ok(Self(session))
        } else {
            tracing::debug!(path = %parts.uri.path(), "admin route without session");
            Err(Redirect::to("/admin/login").into_response())
        }
    }
}

/// Client address used to key login throttling.
pub struct ClientKey(pub String);

impl<S: Send + Sync> FromRequestParts<S> for ClientKey {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let key = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
            .unwrap_or_else(|| "local".to_string());
        Ok(Self(key))
    }
}

pub type LoginLimiter = DefaultKeyedRateLimiter<String>;

pub fn login_limiter(config: &Config) -> LoginLimiter {
    let burst = NonZeroU32::new(config.login_burst.max(1)).unwrap_or(NonZeroU32::MIN);
    let quota = Quota::with_period(Duration::from_secs(config.login_replenish_secs.max(1)))
        .unwrap_or_else(|| Quota::per_minute(NonZeroU32::MIN))
        .allow_burst(burst);
    RateLimiter::keyed(quota)
}

/// Spends one login attempt for `gate` from `client`. False once the client is over its quota.
pub fn take_login_attempt(limiter: &LoginLimiter, gate: &str, client: &str) -> bool {
    limiter.check_key(&format!("{gate}:{client}")).is_ok()
}

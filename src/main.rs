mod admin;
mod booking;
mod config;
mod db;
mod entities;
mod error;
mod models;
mod routes;
mod session;
mod store;
mod templates;
mod ticket;

use std::{net::SocketAddr, sync::Arc};

use axum::{
    Router,
    extract::{DefaultBodyLimit, FromRef},
    routing::{get, post},
};
use axum_extra::extract::cookie::Key;
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::{
    config::Config,
    session::{LoginLimiter, login_limiter},
    store::Store,
};

const POSTER_UPLOAD_LIMIT: usize = 8 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Store,
    pub cookie_key: Key,
    pub login_limiter: Arc<LoginLimiter>,
}

impl AppState {
    pub fn new(config: Arc<Config>, store: Store) -> Self {
        let cookie_key = Key::derive_from(config.secret_key.as_bytes());
        let login_limiter = Arc::new(login_limiter(&config));
        Self { config, store, cookie_key, login_limiter }
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

pub fn app(state: AppState) -> Router {
    let posters = ServeDir::new(&state.config.poster_dir);

    Router::new()
        .route("/", get(routes::index))
        .route("/healthz", get(routes::healthz))
        .route("/booking", get(routes::booking_mode).post(routes::booking_choose))
        .route("/consent", get(routes::consent_form).post(routes::consent_submit))
        .route("/reserve", get(routes::reserve_alias))
        .route("/reserve/{rtype}", get(routes::reserve_form).post(routes::reserve_submit))
        .route("/tickets", get(routes::tickets))
        .route("/tickets/{id}", get(routes::ticket_detail))
        .route("/tickets/{id}/delete", post(routes::ticket_delete))
        .route("/teacher/login", get(routes::teacher_login_form).post(routes::teacher_login))
        .route("/teacher/logout", get(routes::teacher_logout))
        .route("/admin/login", get(routes::admin_login_form).post(routes::admin_login))
        .route("/admin/logout", get(routes::admin_logout))
        .route("/admin", get(routes::admin_dashboard))
        .route("/admin/movies", get(routes::admin_movies).post(routes::admin_movie_create))
        .route("/admin/movies/{id}", get(routes::admin_movie).post(routes::admin_movie_update))
        .route("/admin/movies/{id}/delete", post(routes::admin_movie_delete))
        .route("/admin/movies/{id}/schedule", post(routes::admin_screening_add))
        .route("/admin/movies/{id}/schedule/{date}/delete", post(routes::admin_screening_delete))
        .route(
            "/admin/movies/{id}/poster",
            post(routes::admin_poster_upload).layer(DefaultBodyLimit::max(POSTER_UPLOAD_LIMIT)),
        )
        .route("/admin/tickets/{id}/status", post(routes::admin_ticket_status))
        .route("/admin/tickets/{id}/delete", post(routes::admin_ticket_delete))
        .route("/admin/export/{file}", get(routes::admin_export))
        .nest_service("/posters", posters)
        .fallback(routes::not_found)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,school_cinema=debug,sqlx=warn".to_string()),
        )
        .init();

    let config = Arc::new(Config::from_env()?);

    tokio::fs::create_dir_all(&config.poster_dir).await?;
    let db = db::connect_and_migrate(&config.database_url, config.database_max_connections).await?;
    let state = AppState::new(config.clone(), Store::new(db));

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    tracing::info!(addr = %config.addr, tz = ?config.timezone.iana_name(), "listening");
    axum::serve(listener, app(state).into_make_service_with_connect_info::<SocketAddr>()).await?;

    Ok(())
}

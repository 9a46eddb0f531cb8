use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Missing or malformed form input. Nothing was written.
    #[error("{0}")]
    Validation(String),

    #[error("{resource} {id} not found")]
    NotFound { resource: &'static str, id: String },

    /// Wrong credentials or no admin session.
    #[error("{0}")]
    Auth(String),

    /// The write would clash with an existing row.
    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Database(#[from] sea_orm::DbErr),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(resource: &'static str, id: impl ToString) -> Self {
        Self::NotFound { resource, id: id.to_string() }
    }

    /// Errors the user can fix by editing the form they just submitted.
    pub fn is_form_error(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::Conflict(_))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Auth(_) => StatusCode::SEE_OTHER,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Database(_) | Self::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to a visitor.
    pub fn user_message(&self) -> String {
        match self {
            Self::Database(_) | Self::Other(_) => {
                "Something went wrong. Please try again.".to_string()
            },
            other => other.to_string(),
        }
    }
}

impl From<jiff::Error> for AppError {
    fn from(err: jiff::Error) -> Self {
        Self::Other(anyhow::Error::new(err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::Other(anyhow::Error::new(err))
    }
}

impl From<csv::Error> for AppError {
    fn from(err: csv::Error) -> Self {
        Self::Other(anyhow::Error::new(err))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            Self::Database(_) | Self::Other(_) => tracing::error!(error = ?self, "request failed"),
            Self::Auth(msg) => tracing::info!(reason = %msg, "admin access refused"),
            _ => tracing::debug!(error = %self, "request rejected"),
        }

        if let Self::Auth(_) = self {
            return Redirect::to("/admin/login").into_response();
        }

        let status = self.status_code();
        let body = match &self {
            Self::NotFound { .. } => crate::templates::not_found_page(&self.user_message()),
            _ => crate::templates::error_page(&self.user_message()),
        };
        (status, Html(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_errors_are_not_leaked() {
        let err = AppError::Other(anyhow::anyhow!("disk /var/db is full"));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.user_message().contains("/var/db"));
    }

    #[test]
    fn not_found_names_the_resource() {
        let err = AppError::not_found("reservation", "25031430215");
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.user_message(), "reservation 25031430215 not found");
    }

    #[test]
    fn auth_errors_redirect_to_login() {
        let resp = AppError::Auth("no session".into()).into_response();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(resp.headers()["location"], "/admin/login");
    }
}

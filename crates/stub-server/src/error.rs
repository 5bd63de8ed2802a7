use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};

#[derive(Debug, thiserror::Error)]
pub enum StubError {
    #[error("invalid stub options: {0}")]
    InvalidOptions(String),
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed EHR id '{0}'")]
    MalformedEhrId(String),
    #[error("EHR with id {0} not found")]
    EhrNotFound(String),
    #[error("Content-Type must be application/json, got {0}")]
    UnsupportedMediaType(String),
    #[error("request body is not valid JSON: {0}")]
    InvalidJson(String),
    #[error("request body is not a composition: {0}")]
    InvalidComposition(String),
    #[error("composition {0} already exists")]
    DuplicateComposition(String),
    #[error("malformed version uid '{0}'")]
    MalformedVersionUid(String),
    #[error("composition {0} not found")]
    CompositionNotFound(String),
}

impl StubError {
    pub fn status(&self) -> StatusCode {
        match self {
            StubError::MalformedEhrId(_)
            | StubError::InvalidJson(_)
            | StubError::InvalidComposition(_)
            | StubError::DuplicateComposition(_)
            | StubError::MalformedVersionUid(_) => StatusCode::BAD_REQUEST,
            StubError::EhrNotFound(_) | StubError::CompositionNotFound(_) => StatusCode::NOT_FOUND,
            StubError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            StubError::InvalidOptions(_) | StubError::Bind { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Stable machine-readable code carried in error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            StubError::InvalidOptions(_) | StubError::Bind { .. } => "INTERNAL_ERROR",
            StubError::MalformedEhrId(_) => "MALFORMED_EHR_ID",
            StubError::EhrNotFound(_) => "EHR_NOT_FOUND",
            StubError::UnsupportedMediaType(_) => "UNSUPPORTED_MEDIA_TYPE",
            StubError::InvalidJson(_) => "INVALID_JSON",
            StubError::InvalidComposition(_) => "INVALID_COMPOSITION",
            StubError::DuplicateComposition(_) => "DUPLICATE_COMPOSITION",
            StubError::MalformedVersionUid(_) => "MALFORMED_VERSION_UID",
            StubError::CompositionNotFound(_) => "COMPOSITION_NOT_FOUND",
        }
    }
}

impl IntoResponse for StubError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("stub error: {}", self);
        } else {
            tracing::debug!("rejecting request with {}: {}", status, self);
        }
        let body = serde_json::json!({
            "message": self.to_string(),
            "code": self.code(),
        });
        (status, Json(body)).into_response()
    }
}

pub type StubResult<T> = std::result::Result<T, StubError>;

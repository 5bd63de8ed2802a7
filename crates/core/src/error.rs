use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum ConformanceError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("failed to read configuration file: {0}")]
    ConfigFileRead(std::io::Error),
    #[error("failed to parse configuration file: {0}")]
    ConfigFileParse(serde_yaml::Error),
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(reqwest::Error),
    #[error("{method} {url} failed: {source}")]
    Request {
        method: String,
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to read response body from {url}: {source}")]
    ResponseBody {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("openEHR error: {0}")]
    Openehr(#[from] openehr::OpenEhrError),
    #[error("invalid EHR id: {0}")]
    EhrId(#[from] ehr_uuid::UuidError),
    #[error("failed to provision EHR: {0}")]
    Provisioning(String),
    #[error("{context}: expected {expected}, got {actual}; body: {body}")]
    Assertion {
        context: String,
        expected: String,
        actual: String,
        body: String,
    },
    #[error("unknown check '{0}'")]
    UnknownCheck(String),
    #[error("failed to write {what}: {source}")]
    FileWrite {
        what: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize {what}: {source}")]
    Serialization {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl ConformanceError {
    /// Builds an assertion failure for an unexpected status code.
    pub fn unexpected_status(
        context: impl Into<String>,
        expected: StatusCode,
        actual: StatusCode,
        body: &str,
    ) -> Self {
        Self::Assertion {
            context: context.into(),
            expected: expected.to_string(),
            actual: actual.to_string(),
            body: crate::response::excerpt(body),
        }
    }

    /// True for failed expectations, as opposed to transport or setup failures.
    pub fn is_assertion(&self) -> bool {
        matches!(self, Self::Assertion { .. })
    }
}

pub type ConformanceResult<T> = std::result::Result<T, ConformanceError>;

//! Conformance run configuration.
//!
//! Configuration is resolved once at process startup and then passed into the session. Checks
//! never read process-wide environment variables, which keeps test harnesses that run several
//! sessions side by side deterministic.
//!
//! Sources, lowest precedence first:
//! 1. built-in defaults (see [`crate::constants`])
//! 2. an optional YAML file named by `EHR_CONFORMANCE_CONFIG`
//! 3. `EHR_CONFORMANCE_*` environment variables (a `.env` file is loaded first if present)

use crate::constants::{
    BUNDLED_COMPOSITION, DEFAULT_BASE_URL, DEFAULT_SYSTEM_ID, DEFAULT_TIMEOUT_SECS,
    ENV_AUDIT_COMMITTER, ENV_BASE_URL, ENV_COMPOSITION, ENV_CONFIG_FILE, ENV_EHR_ID,
    ENV_FRESH_UIDS, ENV_OPENEHR_VERSION, ENV_SYSTEM_ID, ENV_TIMEOUT_SECS,
};
use crate::{ConformanceError, ConformanceResult};
use ehr_uuid::EhrId;
use openehr::CompositionPayload;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct ConformanceConfig {
    base_url: String,
    ehr_id: Option<EhrId>,
    composition_path: Option<PathBuf>,
    timeout: Duration,
    openehr_version: Option<String>,
    audit_committer: Option<String>,
    system_id: String,
    fresh_uids: bool,
}

/// Shape of the optional YAML configuration file. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub base_url: Option<String>,
    pub ehr_id: Option<String>,
    pub composition: Option<PathBuf>,
    pub timeout_secs: Option<u64>,
    pub openehr_version: Option<String>,
    pub audit_committer: Option<String>,
    pub system_id: Option<String>,
    pub fresh_uids: Option<bool>,
}

impl FileConfig {
    /// Reads a YAML configuration file.
    pub fn from_path(path: &Path) -> ConformanceResult<Self> {
        let text = std::fs::read_to_string(path).map_err(ConformanceError::ConfigFileRead)?;
        serde_yaml::from_str(&text).map_err(ConformanceError::ConfigFileParse)
    }
}

impl ConformanceConfig {
    /// Create a configuration for `base_url` with defaults for everything else.
    pub fn new(base_url: impl Into<String>) -> ConformanceResult<Self> {
        let base_url = base_url.into();
        validate_base_url(&base_url)?;

        Ok(Self {
            base_url,
            ehr_id: None,
            composition_path: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            openehr_version: None,
            audit_committer: None,
            system_id: DEFAULT_SYSTEM_ID.to_string(),
            fresh_uids: true,
        })
    }

    /// Load from `.env`, the optional YAML file and the process environment.
    pub fn load() -> ConformanceResult<Self> {
        dotenvy::dotenv().ok();

        let file = match non_empty(std::env::var(ENV_CONFIG_FILE).ok()) {
            Some(path) => {
                tracing::debug!("reading configuration file {}", path);
                FileConfig::from_path(Path::new(&path))?
            }
            None => FileConfig::default(),
        };

        Self::from_sources(file, |key| std::env::var(key).ok())
    }

    /// Resolve configuration from a file layer and an environment lookup.
    ///
    /// `lookup` stands in for `std::env::var` so tests need not mutate the process environment.
    /// Empty or whitespace-only values count as unset.
    pub fn from_sources<F>(file: FileConfig, lookup: F) -> ConformanceResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |key: &str| non_empty(lookup(key));

        let base_url = env(ENV_BASE_URL)
            .or(file.base_url)
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let mut config = Self::new(base_url)?;

        if let Some(ehr_id) = env(ENV_EHR_ID).or(non_empty(file.ehr_id)) {
            config.ehr_id = Some(EhrId::parse(&ehr_id)?);
        }

        config.composition_path = env(ENV_COMPOSITION)
            .map(PathBuf::from)
            .or(file.composition);

        if let Some(raw) = env(ENV_TIMEOUT_SECS) {
            config.timeout = parse_timeout_seconds(ENV_TIMEOUT_SECS, &raw)?;
        } else if let Some(secs) = file.timeout_secs {
            config.timeout = parse_timeout_seconds("timeout_secs", &secs.to_string())?;
        }

        config.openehr_version = env(ENV_OPENEHR_VERSION).or(non_empty(file.openehr_version));
        config.audit_committer = env(ENV_AUDIT_COMMITTER).or(non_empty(file.audit_committer));

        if let Some(system_id) = env(ENV_SYSTEM_ID).or(non_empty(file.system_id)) {
            config = config.with_system_id(system_id)?;
        }

        if let Some(raw) = env(ENV_FRESH_UIDS) {
            config.fresh_uids = parse_bool(ENV_FRESH_UIDS, &raw)?;
        } else if let Some(fresh) = file.fresh_uids {
            config.fresh_uids = fresh;
        }

        Ok(config)
    }

    /// Replace the base URL, validating it as [`ConformanceConfig::new`] does.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> ConformanceResult<Self> {
        let base_url = base_url.into();
        validate_base_url(&base_url)?;
        self.base_url = base_url;
        Ok(self)
    }

    pub fn with_ehr_id(mut self, ehr_id: EhrId) -> Self {
        self.ehr_id = Some(ehr_id);
        self
    }

    pub fn with_composition_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.composition_path = Some(path.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_openehr_version(mut self, version: impl Into<String>) -> Self {
        self.openehr_version = Some(version.into());
        self
    }

    pub fn with_audit_committer(mut self, committer: impl Into<String>) -> Self {
        self.audit_committer = Some(committer.into());
        self
    }

    /// Set the creating system id. It must be safe to embed in a version uid.
    pub fn with_system_id(mut self, system_id: impl Into<String>) -> ConformanceResult<Self> {
        let system_id = system_id.into();
        openehr::version_id::check_stamped_system_id(&system_id)?;
        self.system_id = system_id;
        Ok(self)
    }

    pub fn with_fresh_uids(mut self, fresh_uids: bool) -> Self {
        self.fresh_uids = fresh_uids;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn ehr_id(&self) -> Option<EhrId> {
        self.ehr_id
    }

    pub fn composition_path(&self) -> Option<&Path> {
        self.composition_path.as_deref()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn openehr_version(&self) -> Option<&str> {
        self.openehr_version.as_deref()
    }

    pub fn audit_committer(&self) -> Option<&str> {
        self.audit_committer.as_deref()
    }

    pub fn system_id(&self) -> &str {
        &self.system_id
    }

    pub fn fresh_uids(&self) -> bool {
        self.fresh_uids
    }

    /// Load the composition fixture: the configured file, or the bundled one.
    pub fn load_composition(&self) -> ConformanceResult<CompositionPayload> {
        let payload = match &self.composition_path {
            Some(path) => CompositionPayload::from_path(path)?,
            None => CompositionPayload::from_json_str(BUNDLED_COMPOSITION)?,
        };
        Ok(payload)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn validate_base_url(base_url: &str) -> ConformanceResult<()> {
    let parsed = url::Url::parse(base_url).map_err(|e| {
        ConformanceError::InvalidConfig(format!("base URL '{}' is not a URL: {}", base_url, e))
    })?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConformanceError::InvalidConfig(format!(
            "base URL '{}' must use http or https",
            base_url
        )));
    }

    if parsed.query().is_some() || parsed.fragment().is_some() {
        return Err(ConformanceError::InvalidConfig(format!(
            "base URL '{}' must not carry a query or fragment",
            base_url
        )));
    }

    Ok(())
}

fn parse_timeout_seconds(key: &str, raw: &str) -> ConformanceResult<Duration> {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConformanceError::InvalidConfig(format!(
            "{} must be a positive integer number of seconds, got '{}'",
            key, raw
        ))),
    }
}

fn parse_bool(key: &str, raw: &str) -> ConformanceResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(ConformanceError::InvalidConfig(format!(
            "{} must be true/false or 1/0, got '{}'",
            key, raw
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_nothing_is_set() {
        let config = ConformanceConfig::from_sources(FileConfig::default(), lookup(&[])).unwrap();

        assert_eq!(config.base_url(), DEFAULT_BASE_URL);
        assert!(config.ehr_id().is_none());
        assert!(config.composition_path().is_none());
        assert_eq!(config.timeout(), Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert_eq!(config.system_id(), DEFAULT_SYSTEM_ID);
        assert!(config.fresh_uids());
        assert!(config.openehr_version().is_none());
    }

    #[test]
    fn test_environment_values_are_parsed() {
        let config = ConformanceConfig::from_sources(
            FileConfig::default(),
            lookup(&[
                (ENV_BASE_URL, "https://ehr.example.org/rest/openehr/v1"),
                (ENV_EHR_ID, "550e8400-e29b-41d4-a716-446655440000"),
                (ENV_COMPOSITION, "/tmp/vitals.json"),
                (ENV_TIMEOUT_SECS, "5"),
                (ENV_OPENEHR_VERSION, "1.0.3"),
                (ENV_AUDIT_COMMITTER, "Conformance Bot"),
                (ENV_SYSTEM_ID, "test.system"),
                (ENV_FRESH_UIDS, "0"),
            ]),
        )
        .unwrap();

        assert_eq!(config.base_url(), "https://ehr.example.org/rest/openehr/v1");
        assert_eq!(
            config.ehr_id().unwrap().to_string(),
            "550e8400-e29b-41d4-a716-446655440000"
        );
        assert_eq!(config.composition_path(), Some(Path::new("/tmp/vitals.json")));
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert_eq!(config.openehr_version(), Some("1.0.3"));
        assert_eq!(config.audit_committer(), Some("Conformance Bot"));
        assert_eq!(config.system_id(), "test.system");
        assert!(!config.fresh_uids());
    }

    #[test]
    fn test_empty_ehr_id_means_provision() {
        let config =
            ConformanceConfig::from_sources(FileConfig::default(), lookup(&[(ENV_EHR_ID, "  ")]))
                .unwrap();
        assert!(config.ehr_id().is_none());
    }

    #[test]
    fn test_invalid_values_fail_closed() {
        for (key, value) in [
            (ENV_BASE_URL, "not a url"),
            (ENV_BASE_URL, "ftp://example.org"),
            (ENV_BASE_URL, "http://example.org/v1?x=1"),
            (ENV_TIMEOUT_SECS, "0"),
            (ENV_TIMEOUT_SECS, "soon"),
            (ENV_FRESH_UIDS, "maybe"),
            (ENV_SYSTEM_ID, "bad/system"),
        ] {
            let result = ConformanceConfig::from_sources(FileConfig::default(), lookup(&[(key, value)]));
            assert!(result.is_err(), "expected {}={} to be rejected", key, value);
        }

        let result = ConformanceConfig::from_sources(
            FileConfig::default(),
            lookup(&[(ENV_EHR_ID, "invalid_Ehr_ID")]),
        );
        assert!(matches!(result, Err(ConformanceError::EhrId(_))));
    }

    #[test]
    fn test_environment_overrides_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "base_url: http://file.example.org/openehr/v1\ntimeout_secs: 7\nfresh_uids: false\nopenehr_version: 1.0.2"
        )
        .unwrap();
        let file_config = FileConfig::from_path(file.path()).unwrap();

        let config = ConformanceConfig::from_sources(
            file_config,
            lookup(&[(ENV_BASE_URL, "http://env.example.org/openehr/v1")]),
        )
        .unwrap();

        assert_eq!(config.base_url(), "http://env.example.org/openehr/v1");
        assert_eq!(config.timeout(), Duration::from_secs(7));
        assert!(!config.fresh_uids());
        assert_eq!(config.openehr_version(), Some("1.0.2"));
    }

    #[test]
    fn test_file_rejects_unknown_keys() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "base_ur1: http://typo.example.org").unwrap();
        assert!(matches!(
            FileConfig::from_path(file.path()),
            Err(ConformanceError::ConfigFileParse(_))
        ));
    }

    #[test]
    fn test_with_base_url_validates() {
        let config = ConformanceConfig::new(DEFAULT_BASE_URL).unwrap();
        let config = config.with_base_url("https://other.example.org/v1").unwrap();
        assert_eq!(config.base_url(), "https://other.example.org/v1");
        assert!(config.with_base_url("mailto:x@example.org").is_err());
    }

    #[test]
    fn test_bundled_composition_loads() {
        let config = ConformanceConfig::new(DEFAULT_BASE_URL).unwrap();
        let payload = config.load_composition().unwrap();
        assert_eq!(payload.name(), Some("Vital signs"));
        assert!(payload.uid().is_none());
    }
}

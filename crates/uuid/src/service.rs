//! Internal implementation of the EHR identifier type.

use crate::{UuidError, UuidResult};
use std::{fmt, str::FromStr};

/// Re-exported for convenience.
pub use ::uuid::Uuid;

/// A well-formed EHR identifier.
///
/// Once constructed, the contained UUID is valid and displays in the lowercase hyphenated form
/// used on the wire by openEHR REST servers.
///
/// # Construction
/// - [`EhrId::new`] generates a random identifier. Used for "unknown EHR" checks and by servers
///   allocating new EHRs.
/// - [`EhrId::parse`] validates an externally supplied identifier.
///
/// # Errors
/// [`EhrId::parse`] returns [`UuidError::InvalidInput`] if the input is not a hyphenated or
/// simple UUID.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EhrId(Uuid);

impl Default for EhrId {
    fn default() -> Self {
        Self::new()
    }
}

impl EhrId {
    /// Generates a new random (v4) EHR identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Validates and parses an EHR identifier.
    ///
    /// # Arguments
    ///
    /// * `input` - Identifier in hyphenated (36 chars) or simple (32 chars) UUID form.
    ///
    /// # Errors
    ///
    /// Returns [`UuidError::InvalidInput`] if `input` is not well-formed.
    pub fn parse(input: &str) -> UuidResult<Self> {
        if !Self::is_well_formed(input) {
            return Err(UuidError::InvalidInput(format!(
                "EHR id must be a hyphenated or 32 hex character UUID, got: '{}'",
                input
            )));
        }
        Uuid::try_parse(input)
            .map(Self)
            .map_err(|e| UuidError::InvalidInput(format!("invalid EHR id '{}': {}", input, e)))
    }

    /// Returns true if `input` is a syntactically valid EHR identifier.
    ///
    /// This is a purely syntactic check:
    /// - 32 hex characters, or
    /// - 36 characters with hyphens at positions 8, 13, 18 and 23 and hex elsewhere.
    pub fn is_well_formed(input: &str) -> bool {
        let bytes = input.as_bytes();
        match bytes.len() {
            32 => bytes.iter().all(u8::is_ascii_hexdigit),
            36 => bytes.iter().enumerate().all(|(i, b)| match i {
                8 | 13 | 18 | 23 => *b == b'-',
                _ => b.is_ascii_hexdigit(),
            }),
            _ => false,
        }
    }

    /// Returns the underlying `uuid::Uuid`.
    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

impl From<Uuid> for EhrId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl fmt::Display for EhrId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for EhrId {
    type Err = UuidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EhrId::parse(s)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for EhrId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for EhrId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        EhrId::parse(&s).map_err(serde::de::Error::custom)
    }
}

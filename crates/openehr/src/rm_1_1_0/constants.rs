//! Constants for RM 1.1.0 structures.

/// `_type` of a composition in canonical JSON.
pub const RM_TYPE_COMPOSITION: &str = "COMPOSITION";

/// `_type` of a composition version identifier.
pub const RM_TYPE_OBJECT_VERSION_ID: &str = "OBJECT_VERSION_ID";

/// `_type` of an EHR identifier.
pub const RM_TYPE_HIER_OBJECT_ID: &str = "HIER_OBJECT_ID";

/// `_type` of an EHR status.
pub const RM_TYPE_EHR_STATUS: &str = "EHR_STATUS";

/// `_type` of plain text values such as a composition's `name`.
pub const RM_TYPE_DV_TEXT: &str = "DV_TEXT";

/// Default archetype node ID for EHR_STATUS.
pub const DEFAULT_EHR_STATUS_ARCHETYPE_NODE_ID: &str = "openEHR-EHR-EHR_STATUS.generic.v1";

/// Default name for EHR_STATUS.
pub const DEFAULT_EHR_STATUS_NAME: &str = "EHR Status";

//! In-memory EHR and composition store.

use crate::error::{StubError, StubResult};
use chrono::{DateTime, Utc};
use ehr_uuid::EhrId;
use openehr::{CompositionPayload, ObjectVersionId};
use std::collections::HashMap;

/// A stored composition version.
#[derive(Clone, Debug)]
pub struct StoredComposition {
    pub version_uid: ObjectVersionId,
    pub composition: CompositionPayload,
    /// Canonical JSON of the body as submitted, used to detect identical resubmissions.
    submitted: String,
}

/// One EHR and its compositions.
#[derive(Clone, Debug)]
pub struct EhrRecord {
    pub ehr_id: EhrId,
    pub time_created: DateTime<Utc>,
    pub compositions: Vec<StoredComposition>,
}

/// All server state. Wrapped in a `tokio::sync::RwLock` by the router.
#[derive(Debug)]
pub struct Store {
    system_id: String,
    ehrs: HashMap<EhrId, EhrRecord>,
}

impl Store {
    pub fn new(system_id: impl Into<String>) -> Self {
        Self {
            system_id: system_id.into(),
            ehrs: HashMap::new(),
        }
    }

    pub fn system_id(&self) -> &str {
        &self.system_id
    }

    /// Allocate a new empty EHR.
    pub fn create_ehr(&mut self) -> EhrRecord {
        let record = EhrRecord {
            ehr_id: EhrId::new(),
            time_created: Utc::now(),
            compositions: Vec::new(),
        };
        self.ehrs.insert(record.ehr_id, record.clone());
        record
    }

    /// Create an empty EHR with the given id unless it exists. Returns whether it was created.
    pub fn ensure_ehr(&mut self, ehr_id: EhrId) -> bool {
        if self.ehrs.contains_key(&ehr_id) {
            return false;
        }
        self.ehrs.insert(
            ehr_id,
            EhrRecord {
                ehr_id,
                time_created: Utc::now(),
                compositions: Vec::new(),
            },
        );
        true
    }

    pub fn ehr(&self, ehr_id: &EhrId) -> Option<&EhrRecord> {
        self.ehrs.get(ehr_id)
    }

    pub fn ehr_count(&self) -> usize {
        self.ehrs.len()
    }

    /// Store a composition under `ehr_id`.
    ///
    /// A composition without a `uid` is assigned a fresh one. With `reject_duplicates`, a
    /// composition whose uid object id is already stored, or a uid-less body identical to one
    /// already submitted, is rejected.
    pub fn insert_composition(
        &mut self,
        ehr_id: &EhrId,
        composition: CompositionPayload,
        reject_duplicates: bool,
    ) -> StubResult<StoredComposition> {
        let system_id = self.system_id.clone();
        let record = self
            .ehrs
            .get_mut(ehr_id)
            .ok_or_else(|| StubError::EhrNotFound(ehr_id.to_string()))?;

        let submitted = composition.to_body();
        let supplied_uid = composition.uid();

        if reject_duplicates {
            let duplicate = record.compositions.iter().find(|stored| match &supplied_uid {
                Some(uid) => stored.version_uid.object_id() == uid.object_id(),
                None => stored.submitted == submitted,
            });
            if let Some(existing) = duplicate {
                return Err(StubError::DuplicateComposition(
                    existing.version_uid.to_string(),
                ));
            }
        }

        let version_uid = match supplied_uid {
            Some(uid) => uid,
            None => ObjectVersionId::fresh(&system_id)
                .map_err(|e| StubError::InvalidOptions(e.to_string()))?,
        };

        let stored = StoredComposition {
            composition: composition.with_uid(&version_uid),
            version_uid,
            submitted,
        };
        record.compositions.push(stored.clone());
        Ok(stored)
    }

    /// Find a composition by full version uid or by bare object id.
    ///
    /// A bare object id returns the most recently stored version of that object.
    pub fn composition(&self, ehr_id: &EhrId, key: &str) -> StubResult<&StoredComposition> {
        let record = self
            .ehrs
            .get(ehr_id)
            .ok_or_else(|| StubError::EhrNotFound(ehr_id.to_string()))?;

        let found = if key.contains("::") {
            let version_uid = ObjectVersionId::parse(key)
                .map_err(|_| StubError::MalformedVersionUid(key.to_string()))?;
            record
                .compositions
                .iter()
                .rev()
                .find(|stored| stored.version_uid == version_uid)
        } else {
            record
                .compositions
                .iter()
                .rev()
                .find(|stored| stored.version_uid.object_id() == key)
        };

        found.ok_or_else(|| StubError::CompositionNotFound(key.to_string()))
    }
}

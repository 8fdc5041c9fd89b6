//! Catalog descriptors supplied by the catalog collaborator

use serde::{Deserialize, Serialize};

/// A catalog entity (species) identified by an opaque code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub entity_id: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scientific_name: Option<String>,
}

/// A downloadable recording owned by one entity
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Recording {
    pub recording_id: String,
    pub entity_id: String,
    pub recording_url: String,
}

impl Recording {
    pub fn new(
        recording_id: impl Into<String>,
        entity_id: impl Into<String>,
        recording_url: impl Into<String>,
    ) -> Self {
        Self {
            recording_id: recording_id.into(),
            entity_id: entity_id.into(),
            recording_url: recording_url.into(),
        }
    }

    /// File extension of the URL path, used as a decoder format hint
    pub fn url_extension(&self) -> Option<&str> {
        let path = self.recording_url.split(|c| c == '?' || c == '#').next()?;
        let file_name = path.rsplit('/').next()?;
        let (_, ext) = file_name.rsplit_once('.')?;
        if ext.is_empty() || ext.len() > 5 {
            None
        } else {
            Some(ext)
        }
    }
}

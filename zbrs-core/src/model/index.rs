//! Repository index documents served by discovery sources.

use serde::{Deserialize, Serialize};

use crate::error::{Result, ZbrsError};

/// Which index layout a source serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexFormat {
    /// `{ "registry": true, "repositories": [...] }`
    Registry,
    /// `{ "version": "...", "repositories": [...] }`
    Legacy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryIndex {
    #[serde(default)]
    pub registry: Option<bool>,
    #[serde(default)]
    pub version: Option<String>,
    pub repositories: Vec<IndexEntry>,
}

impl RepositoryIndex {
    /// Decode an index document, accepting both the registry and legacy layouts.
    pub fn from_value(raw: serde_json::Value) -> Result<Self> {
        let index: Self = serde_json::from_value(raw)
            .map_err(|e| ZbrsError::Decode(format!("repository index: {e}")))?;
        if index.format().is_none() {
            return Err(ZbrsError::Decode(
                "repository index has neither `registry: true` nor a `version`".into(),
            ));
        }
        Ok(index)
    }

    pub fn format(&self) -> Option<IndexFormat> {
        if self.registry == Some(true) {
            Some(IndexFormat::Registry)
        } else if self.version.is_some() {
            Some(IndexFormat::Legacy)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub id: String,
    pub name: String,
    /// Location of the repository (its directory or its `manifest.json`).
    pub url: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_registry_layout() {
        let index = RepositoryIndex::from_value(json!({
            "registry": true,
            "repositories": [{ "id": "kjv", "name": "KJV", "url": "https://example.org/kjv" }]
        }))
        .unwrap();
        assert_eq!(index.format(), Some(IndexFormat::Registry));
        assert_eq!(index.repositories.len(), 1);
    }

    #[test]
    fn test_legacy_layout() {
        let index = RepositoryIndex::from_value(json!({
            "version": "1.0",
            "repositories": []
        }))
        .unwrap();
        assert_eq!(index.format(), Some(IndexFormat::Legacy));
    }

    #[test]
    fn test_unrecognized_layout_rejected() {
        let err = RepositoryIndex::from_value(json!({ "repositories": [] })).unwrap_err();
        assert!(matches!(err, ZbrsError::Decode(_)));
    }
}

//! ZBRS manifest shapes.
//!
//! A `manifest.json` is either a *parent* manifest that coordinates several
//! translations, or a *translation* manifest that carries content. The two are
//! told apart structurally once, at the decode boundary, and every consumer
//! afterwards matches on [`ZbrsManifest`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Result, ZbrsError};

/// Which of the two manifest shapes a raw document has.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ManifestKind {
    Parent,
    Translation,
}

impl ManifestKind {
    /// Classify a raw manifest by its keys.
    ///
    /// A `translations` array together with a `publisher` key marks a parent;
    /// a `content` key marks a translation. Anything else is unknown.
    pub fn classify(raw: &Value) -> Option<Self> {
        let obj = raw.as_object()?;
        if obj.get("translations").is_some_and(Value::is_array) && obj.contains_key("publisher") {
            Some(Self::Parent)
        } else if obj.contains_key("content") {
            Some(Self::Translation)
        } else {
            None
        }
    }
}

impl std::fmt::Display for ManifestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parent => write!(f, "parent"),
            Self::Translation => write!(f, "translation"),
        }
    }
}

/// A decoded manifest of either shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ZbrsManifest {
    Parent(ParentManifest),
    Translation(TranslationManifest),
}

impl ZbrsManifest {
    /// Decode a raw JSON document into the matching manifest variant.
    pub fn from_value(raw: Value) -> Result<Self> {
        match ManifestKind::classify(&raw) {
            Some(ManifestKind::Parent) => serde_json::from_value(raw)
                .map(Self::Parent)
                .map_err(|e| ZbrsError::Decode(format!("parent manifest: {e}"))),
            Some(ManifestKind::Translation) => serde_json::from_value(raw)
                .map(Self::Translation)
                .map_err(|e| ZbrsError::Decode(format!("translation manifest: {e}"))),
            None => Err(ZbrsError::Decode(
                "document is neither a parent nor a translation manifest".into(),
            )),
        }
    }

    pub fn kind(&self) -> ManifestKind {
        match self {
            Self::Parent(_) => ManifestKind::Parent,
            Self::Translation(_) => ManifestKind::Translation,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::Parent(m) => &m.repository.id,
            Self::Translation(m) => &m.repository.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Parent(m) => &m.repository.name,
            Self::Translation(m) => &m.repository.name,
        }
    }

    pub fn version(&self) -> &str {
        match self {
            Self::Parent(m) => &m.repository.version,
            Self::Translation(m) => &m.repository.version,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParentManifest {
    pub zbrs_version: String,
    pub repository: ParentRepositoryInfo,
    pub publisher: Option<Publisher>,
    pub translations: Vec<TranslationReference>,
    pub technical: TechnicalInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParentRepositoryInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub version: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    /// Always `"parent"` for a well-formed manifest.
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Publisher {
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub contact: Option<String>,
}

/// Entry of a parent manifest's `translations` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationReference {
    pub id: String,
    pub name: String,
    /// Directory of the translation, relative to the parent.
    pub directory: String,
    pub language: String,
    pub status: TranslationStatus,
    /// Digest of the translation's `manifest.json`.
    #[serde(default)]
    pub checksum: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranslationStatus {
    Active,
    Inactive,
    Deprecated,
}

impl std::fmt::Display for TranslationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Inactive => write!(f, "inactive"),
            Self::Deprecated => write!(f, "deprecated"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationManifest {
    pub zbrs_version: String,
    pub repository: TranslationRepositoryInfo,
    pub content: ContentInfo,
    pub technical: TechnicalInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationRepositoryInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub version: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    pub language: LanguageInfo,
    pub translation: TranslationInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageInfo {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub direction: TextDirection,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextDirection {
    #[default]
    Ltr,
    Rtl,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationInfo {
    /// Translation philosophy, e.g. "formal", "dynamic", "paraphrase".
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub year: Option<u16>,
    #[serde(default)]
    pub copyright: Option<String>,
    #[serde(default)]
    pub license: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentInfo {
    pub books_count: u32,
    pub testament: TestamentCounts,
    #[serde(default)]
    pub features: ContentFeatures,
    /// Explicit book file list. When absent, books are discovered under
    /// `books/` next to the manifest.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub books: Option<Vec<ContentBookReference>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestamentCounts {
    pub old: u32,
    pub new: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentFeatures {
    #[serde(default)]
    pub has_footnotes: bool,
    #[serde(default)]
    pub has_cross_references: bool,
    #[serde(default)]
    pub has_study_notes: bool,
    #[serde(default)]
    pub has_audio: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentBookReference {
    /// Path relative to the translation directory, e.g. `books/01-genesis.json`.
    pub path: String,
    #[serde(default)]
    pub checksum: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub media_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TechnicalInfo {
    pub encoding: String,
    #[serde(default)]
    pub compression: Option<String>,
    #[serde(default)]
    pub checksum: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn translation_json() -> Value {
        json!({
            "zbrs_version": "1.0",
            "repository": {
                "id": "kjv",
                "name": "King James Version",
                "version": "1.0.0",
                "language": { "code": "en", "name": "English", "direction": "ltr" },
                "translation": { "type": "formal", "year": 1611 }
            },
            "content": { "books_count": 66, "testament": { "old": 39, "new": 27 } },
            "technical": { "encoding": "UTF-8" }
        })
    }

    #[test]
    fn test_classify_translation() {
        assert_eq!(
            ManifestKind::classify(&translation_json()),
            Some(ManifestKind::Translation)
        );
    }

    #[test]
    fn test_classify_parent_requires_publisher_key() {
        let with_publisher = json!({ "translations": [], "publisher": null });
        let without_publisher = json!({ "translations": [] });
        assert_eq!(
            ManifestKind::classify(&with_publisher),
            Some(ManifestKind::Parent)
        );
        assert_eq!(ManifestKind::classify(&without_publisher), None);
    }

    #[test]
    fn test_classify_non_object() {
        assert_eq!(ManifestKind::classify(&json!([1, 2, 3])), None);
        assert_eq!(ManifestKind::classify(&json!("manifest")), None);
    }

    #[test]
    fn test_from_value_translation() {
        let manifest = ZbrsManifest::from_value(translation_json()).unwrap();
        assert_eq!(manifest.kind(), ManifestKind::Translation);
        assert_eq!(manifest.id(), "kjv");
        match manifest {
            ZbrsManifest::Translation(t) => {
                assert_eq!(t.repository.language.direction, TextDirection::Ltr);
                assert_eq!(t.repository.translation.year, Some(1611));
                assert!(t.content.books.is_none());
            }
            ZbrsManifest::Parent(_) => panic!("expected translation manifest"),
        }
    }

    #[test]
    fn test_from_value_unknown_shape() {
        let err = ZbrsManifest::from_value(json!({ "zbrs_version": "1.0" })).unwrap_err();
        assert!(matches!(err, ZbrsError::Decode(_)));
    }
}

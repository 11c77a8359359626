//! Filesystem scans for locally checked-out repositories.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, instrument, warn};
use walkdir::WalkDir;

use super::http_client::parse_json;
use super::{DiscoveryService, MANIFEST_FILE};
use crate::error::{Result, ZbrsError};
use crate::model::{ParentManifest, TranslationManifest, ValidationResult, ZbrsManifest};
use crate::validator::is_safe_relative_path;

/// A `manifest.json` that validated.
#[derive(Debug, Clone, Serialize)]
pub struct ScannedRepository {
    /// Directory containing the manifest
    pub path: PathBuf,
    pub manifest: ZbrsManifest,
    /// Carries any warnings
    pub validation: ValidationResult,
}

/// A manifest that was found but could not be used.
#[derive(Debug, Clone, Serialize)]
pub struct ScanError {
    pub path: PathBuf,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationResult>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DirectoryScan {
    pub repositories: Vec<ScannedRepository>,
    /// Non-fatal: manifests that failed to parse or validate
    pub errors: Vec<ScanError>,
}

/// Per-translation outcome of a hierarchical scan.
#[derive(Debug, Clone, Serialize)]
pub struct ScannedTranslation {
    pub id: String,
    pub directory: String,
    pub path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest: Option<TranslationManifest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ScannedTranslation {
    pub fn is_ok(&self) -> bool {
        self.manifest.is_some()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HierarchicalScan {
    pub path: PathBuf,
    pub parent: ParentManifest,
    pub parent_validation: ValidationResult,
    pub translations: Vec<ScannedTranslation>,
}

enum Loaded {
    Valid(ZbrsManifest, ValidationResult),
    Invalid(ValidationResult),
}

impl DiscoveryService {
    /// Find repositories in the immediate subdirectories of `root`.
    ///
    /// Subdirectories without a `manifest.json` are skipped silently.
    #[instrument(skip(self, root), fields(root = %root.as_ref().display()))]
    pub async fn scan_directory_for_repositories(
        &self,
        root: impl AsRef<Path>,
    ) -> Result<DirectoryScan> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(ZbrsError::io(
                root,
                std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
            ));
        }

        let mut manifests: Vec<PathBuf> = WalkDir::new(root)
            .min_depth(2)
            .max_depth(2)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file() && entry.file_name() == MANIFEST_FILE)
            .map(|entry| entry.into_path())
            .collect();
        manifests.sort();

        let mut scan = DirectoryScan::default();
        for manifest_path in manifests {
            let dir = manifest_path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| root.to_path_buf());

            match self.load_manifest(&manifest_path).await {
                Ok(Loaded::Valid(manifest, validation)) => {
                    debug!(path = %dir.display(), id = manifest.id(), "Found repository");
                    scan.repositories.push(ScannedRepository {
                        path: dir,
                        manifest,
                        validation,
                    });
                }
                Ok(Loaded::Invalid(validation)) => {
                    warn!(path = %dir.display(), errors = validation.errors.len(), "Invalid manifest");
                    scan.errors.push(ScanError {
                        path: dir,
                        message: "Manifest failed validation".to_string(),
                        validation: Some(validation),
                    });
                }
                Err(e) => {
                    warn!(path = %dir.display(), error = %e, "Unreadable manifest");
                    scan.errors.push(ScanError {
                        path: dir,
                        message: e.to_string(),
                        validation: None,
                    });
                }
            }
        }

        Ok(scan)
    }

    /// Load the parent manifest at `root` and each translation it declares.
    ///
    /// Translation failures are reported per entry; only an unusable parent
    /// fails the scan.
    #[instrument(skip(self, root), fields(root = %root.as_ref().display()))]
    pub async fn scan_hierarchical_repository(
        &self,
        root: impl AsRef<Path>,
    ) -> Result<HierarchicalScan> {
        let root = root.as_ref();
        let manifest_path = root.join(MANIFEST_FILE);

        let (parent, parent_validation) = match self.load_manifest(&manifest_path).await? {
            Loaded::Valid(ZbrsManifest::Parent(parent), validation) => (parent, validation),
            Loaded::Valid(ZbrsManifest::Translation(_), _) => {
                return Err(ZbrsError::Decode(format!(
                    "{} is a translation manifest, not a parent",
                    manifest_path.display()
                )))
            }
            Loaded::Invalid(result) => {
                return Err(ZbrsError::InvalidManifest {
                    url: manifest_path.display().to_string(),
                    result,
                })
            }
        };

        let mut translations = Vec::with_capacity(parent.translations.len());
        for reference in &parent.translations {
            let path = root.join(&reference.directory);
            let mut scanned = ScannedTranslation {
                id: reference.id.clone(),
                directory: reference.directory.clone(),
                path: path.clone(),
                manifest: None,
                validation: None,
                error: None,
            };

            // The directory must stay inside the scanned tree
            if !is_safe_relative_path(&reference.directory) {
                warn!(
                    translation = %reference.id,
                    directory = %reference.directory,
                    "Unsafe translation directory"
                );
                scanned.path = root.to_path_buf();
                scanned.error = Some(format!(
                    "Unsafe translation directory '{}'",
                    reference.directory
                ));
                translations.push(scanned);
                continue;
            }

            match self.load_manifest(&path.join(MANIFEST_FILE)).await {
                Ok(Loaded::Valid(ZbrsManifest::Translation(manifest), validation)) => {
                    scanned.manifest = Some(manifest);
                    scanned.validation = Some(validation);
                }
                Ok(Loaded::Valid(ZbrsManifest::Parent(_), _)) => {
                    scanned.error = Some("Nested parent manifests are not supported".to_string());
                }
                Ok(Loaded::Invalid(validation)) => {
                    scanned.error = Some("Manifest failed validation".to_string());
                    scanned.validation = Some(validation);
                }
                Err(e) => scanned.error = Some(e.to_string()),
            }

            if let Some(error) = &scanned.error {
                warn!(translation = %reference.id, error = %error, "Translation unavailable");
            }
            translations.push(scanned);
        }

        Ok(HierarchicalScan {
            path: root.to_path_buf(),
            parent,
            parent_validation,
            translations,
        })
    }

    async fn load_manifest(&self, path: &Path) -> Result<Loaded> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| ZbrsError::io(path, e))?;
        let raw = parse_json(&path.display().to_string(), &bytes)?;

        let validation = self.validator.validate_manifest(&raw);
        if !validation.is_valid() {
            return Ok(Loaded::Invalid(validation));
        }
        Ok(Loaded::Valid(ZbrsManifest::from_value(raw)?, validation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::calculate_checksum;
    use crate::config::PipelineConfig;
    use serde_json::{json, Value};

    fn translation(id: &str) -> Value {
        json!({
            "zbrs_version": "1.0",
            "repository": {
                "id": id, "name": id.to_uppercase(), "version": "1.0.0",
                "language": { "code": "en", "name": "English" },
                "translation": { "type": "formal" }
            },
            "content": { "books_count": 66, "testament": { "old": 39, "new": 27 } },
            "technical": { "encoding": "UTF-8", "checksum": calculate_checksum(id.as_bytes()) }
        })
    }

    fn write(dir: &Path, value: &Value) {
        std::fs::create_dir_all(dir).unwrap();
        std::fs::write(dir.join(MANIFEST_FILE), serde_json::to_vec(value).unwrap()).unwrap();
    }

    fn discovery() -> DiscoveryService {
        DiscoveryService::new(&PipelineConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_scan_skips_directories_without_manifest() {
        let root = tempfile::tempdir().unwrap();
        write(&root.path().join("kjv"), &translation("kjv"));
        write(&root.path().join("web"), &translation("web"));
        std::fs::create_dir_all(root.path().join("notes")).unwrap();

        let scan = discovery()
            .scan_directory_for_repositories(root.path())
            .await
            .unwrap();
        assert_eq!(scan.repositories.len(), 2);
        assert!(scan.errors.is_empty());
        assert_eq!(scan.repositories[0].manifest.id(), "kjv");
    }

    #[tokio::test]
    async fn test_scan_reports_invalid_manifest() {
        let root = tempfile::tempdir().unwrap();
        write(&root.path().join("kjv"), &translation("kjv"));
        let mut broken = translation("bad");
        broken["content"]["books_count"] = json!(3);
        write(&root.path().join("bad"), &broken);

        let scan = discovery()
            .scan_directory_for_repositories(root.path())
            .await
            .unwrap();
        assert_eq!(scan.repositories.len(), 1);
        assert_eq!(scan.errors.len(), 1);
        assert!(scan.errors[0].path.ends_with("bad"));
    }

    #[tokio::test]
    async fn test_hierarchical_scan_reports_each_translation() {
        let root = tempfile::tempdir().unwrap();
        let reference = |id: &str| {
            json!({
                "id": id, "name": id, "directory": id, "language": "en",
                "status": "active", "checksum": calculate_checksum(id.as_bytes())
            })
        };
        write(
            root.path(),
            &json!({
                "zbrs_version": "1.0",
                "repository": { "id": "bibles", "name": "Bibles", "version": "1.0.0", "type": "parent" },
                "publisher": { "name": "Example" },
                "translations": [reference("kjv"), reference("missing")],
                "technical": { "encoding": "UTF-8" }
            }),
        );
        write(&root.path().join("kjv"), &translation("kjv"));

        let scan = discovery()
            .scan_hierarchical_repository(root.path())
            .await
            .unwrap();
        assert_eq!(scan.parent.repository.id, "bibles");
        assert_eq!(scan.translations.len(), 2);
        assert!(scan.translations[0].is_ok());
        assert!(!scan.translations[1].is_ok());
        assert!(scan.translations[1].error.is_some());
    }

    #[tokio::test]
    async fn test_hierarchical_scan_stays_inside_root() {
        let outer = tempfile::tempdir().unwrap();
        let root = outer.path().join("bibles");
        write(&outer.path().join("escaped"), &translation("escaped"));

        let reference = |id: &str, directory: &str| {
            json!({
                "id": id, "name": id, "directory": directory, "language": "en",
                "status": "active", "checksum": calculate_checksum(id.as_bytes())
            })
        };
        write(
            &root,
            &json!({
                "zbrs_version": "1.0",
                "repository": { "id": "bibles", "name": "Bibles", "version": "1.0.0", "type": "parent" },
                "publisher": { "name": "Example" },
                "translations": [
                    reference("escaped", "../escaped"),
                    reference("absolute", "/etc"),
                    reference("kjv", "kjv")
                ],
                "technical": { "encoding": "UTF-8" }
            }),
        );
        write(&root.join("kjv"), &translation("kjv"));

        let scan = discovery().scan_hierarchical_repository(&root).await.unwrap();
        assert_eq!(scan.translations.len(), 3);
        for unsafe_translation in &scan.translations[..2] {
            assert!(!unsafe_translation.is_ok());
            assert!(unsafe_translation.validation.is_none());
            assert!(unsafe_translation
                .error
                .as_deref()
                .is_some_and(|e| e.contains("Unsafe translation directory")));
        }
        assert!(scan.translations[2].is_ok());
    }
}

//! Plugin manifests
//!
//! A plugin directory carries a `package.json`-shaped manifest. Only `name`
//! is required; `dependencies` is read as a set of peer plugin names and the
//! version strings are kept but never checked.

use crate::core::error::{BusError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Manifest file expected in every plugin directory
pub const MANIFEST_FILE: &str = "package.json";

/// Parsed manifest of one discovered plugin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginManifest {
    /// Plugin directory the manifest was read from
    pub path: PathBuf,

    /// Plugin name, also the key used to resolve its module
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Peer plugin name -> version string (informational only)
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
}

/// On-disk shape; unknown package.json fields are ignored
#[derive(Debug, Deserialize)]
struct PackageJson {
    name: Option<String>,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    dependencies: BTreeMap<String, String>,
}

impl PluginManifest {
    pub fn dependency_names(&self) -> impl Iterator<Item = &str> {
        self.dependencies.keys().map(String::as_str)
    }

    pub fn depends_on(&self, name: &str) -> bool {
        self.dependencies.contains_key(name)
    }

    /// Parse manifest text for the plugin directory `dir`
    pub fn parse(dir: &Path, text: &str) -> Result<Self> {
        let manifest_path = dir.join(MANIFEST_FILE);
        let raw: PackageJson = serde_json::from_str(text).map_err(|e| BusError::ManifestInvalid {
            path: manifest_path.clone(),
            reason: e.to_string(),
        })?;

        let name = raw
            .name
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| BusError::ManifestInvalid {
                path: manifest_path,
                reason: "missing \"name\"".to_string(),
            })?;

        Ok(Self {
            path: dir.to_path_buf(),
            name,
            version: raw.version,
            dependencies: raw.dependencies,
        })
    }
}

/// Read and parse the manifest in a plugin directory
pub async fn read_manifest(dir: &Path) -> Result<PluginManifest> {
    let manifest_path = dir.join(MANIFEST_FILE);
    let text = match tokio::fs::read_to_string(&manifest_path).await {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(BusError::ManifestNotFound(manifest_path));
        }
        Err(e) => {
            return Err(BusError::ManifestInvalid {
                path: manifest_path,
                reason: e.to_string(),
            });
        }
    };

    PluginManifest::parse(dir, &text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_full_manifest() {
        let text = r#"{
            "name": "firstplugin",
            "version": "0.2.0",
            "main": "index.js",
            "dependencies": { "secondplugin": "1.0.0" }
        }"#;
        let manifest = PluginManifest::parse(Path::new("/p/firstplugin"), text).unwrap();
        assert_eq!(manifest.name, "firstplugin");
        assert_eq!(manifest.version.as_deref(), Some("0.2.0"));
        assert!(manifest.depends_on("secondplugin"));
        assert_eq!(manifest.dependency_names().collect::<Vec<_>>(), vec!["secondplugin"]);
        assert_eq!(manifest.path, PathBuf::from("/p/firstplugin"));
    }

    #[test]
    fn test_parse_rejects_missing_name() {
        let err = PluginManifest::parse(Path::new("/p"), r#"{ "version": "1.0.0" }"#).unwrap_err();
        assert!(matches!(err, BusError::ManifestInvalid { .. }));
        assert_eq!(err.diagnostic_kind(), Some("ENOENT"));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let err = PluginManifest::parse(Path::new("/p"), "not json").unwrap_err();
        assert!(matches!(err, BusError::ManifestInvalid { .. }));
    }

    #[tokio::test]
    async fn test_read_manifest_from_disk() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(MANIFEST_FILE), r#"{ "name": "disk" }"#).unwrap();

        let manifest = read_manifest(dir.path()).await.unwrap();
        assert_eq!(manifest.name, "disk");
        assert!(manifest.dependencies.is_empty());
    }

    #[tokio::test]
    async fn test_read_manifest_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = read_manifest(dir.path()).await.unwrap_err();
        assert!(matches!(err, BusError::ManifestNotFound(_)));
    }
}

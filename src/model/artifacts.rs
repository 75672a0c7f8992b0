//! Artifact store boundary.
//!
//! The pipeline consumes checkpoints through the narrow [`ArtifactStore`]
//! contract: a repository id resolves to a weights blob plus an optional
//! configuration document. The bundled implementation serves a local
//! directory tree; remote stores live behind the same trait.

use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::config::ArtifactConfigDoc;
use crate::error::EegError;

const WEIGHTS_EXTENSION: &str = "safetensors";
const CONFIG_FILES: [&str; 2] = ["config.json", "calibration.json"];

/// Files resolved for one repository id.
#[derive(Debug, Clone)]
pub struct ArtifactBundle {
    pub repo_id: String,
    pub weights_path: PathBuf,
    pub config: Option<ArtifactConfigDoc>,
}

pub trait ArtifactStore: Send + Sync {
    /// Resolves a repository id to its files. Failures are fatal for the
    /// current call and are never retried internally.
    fn fetch(&self, repo_id: &str) -> Result<ArtifactBundle, EegError>;
}

/// Canonical repository id for a checkpoint:
/// `{namespace}/EEGNetV4-{channels}ch-{device}-{version}[-{variant}]`.
pub fn build_repo_id(
    namespace: &str,
    channel_count: usize,
    device_id: &str,
    version: &str,
    variant: Option<&str>,
) -> String {
    let base = format!("{namespace}/EEGNetV4-{channel_count}ch-{device_id}-{version}");
    match variant.map(str::trim).filter(|v| !v.is_empty()) {
        Some(variant) => format!("{base}-{variant}"),
        None => base,
    }
}

/// Serves artifacts from a local directory: `<root>/<repo_id>` holds the
/// weights blob and optional configuration documents.
#[derive(Debug, Clone)]
pub struct DirArtifactStore {
    root: PathBuf,
}

impl DirArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn repo_dir(&self, repo_id: &str) -> PathBuf {
        let mut dir = self.root.clone();
        for part in repo_id.split('/').filter(|p| !p.is_empty()) {
            dir.push(part);
        }
        dir
    }
}

impl ArtifactStore for DirArtifactStore {
    fn fetch(&self, repo_id: &str) -> Result<ArtifactBundle, EegError> {
        let dir = self.repo_dir(repo_id);
        if !dir.is_dir() {
            return Err(EegError::artifact(
                repo_id,
                format!("no repository at {}", dir.display()),
            ));
        }

        let mut weights = Vec::new();
        collect_weights(&dir, &mut weights)
            .map_err(|e| EegError::artifact(repo_id, format!("scan repository: {e}")))?;
        if weights.is_empty() {
            return Err(EegError::artifact(repo_id, "no weights blob found"));
        }
        // Deterministic pick when several blobs are published.
        weights.sort();
        let weights_path = weights.remove(0);

        let config = load_merged_config(repo_id, &dir)?;
        tracing::debug!(
            repo_id,
            weights = %weights_path.display(),
            has_config = config.is_some(),
            "resolved artifact bundle"
        );

        Ok(ArtifactBundle {
            repo_id: repo_id.to_string(),
            weights_path,
            config,
        })
    }
}

fn collect_weights(dir: &Path, out: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_weights(&path, out)?;
        } else if path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(WEIGHTS_EXTENSION))
        {
            out.push(path);
        }
    }
    Ok(())
}

/// Merges `config.json` and `calibration.json` (later files win on key
/// conflicts) into one document. Either file may be absent.
fn load_merged_config(repo_id: &str, dir: &Path) -> Result<Option<ArtifactConfigDoc>, EegError> {
    let mut merged = serde_json::Map::new();
    let mut found = false;
    for name in CONFIG_FILES {
        let path = dir.join(name);
        if !path.is_file() {
            continue;
        }
        let data = std::fs::read_to_string(&path)
            .map_err(|e| EegError::artifact(repo_id, format!("read {name}: {e}")))?;
        let value: Value = serde_json::from_str(&data)
            .map_err(|e| EegError::artifact(repo_id, format!("parse {name}: {e}")))?;
        if let Value::Object(map) = value {
            merged.extend(map);
            found = true;
        }
    }
    if !found {
        return Ok(None);
    }
    let doc = serde_json::from_value(Value::Object(merged))
        .map_err(|e| EegError::artifact(repo_id, format!("interpret configuration: {e}")))?;
    Ok(Some(doc))
}

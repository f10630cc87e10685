//! On-disk module trees for tests.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::{Map, Value, json};
use tempfile::TempDir;

use crate::error::GraphError;
use crate::manifest::{DiskManifests, Manifest, ManifestSource};

/// A temporary directory holding module manifests.
pub(crate) struct Fixture {
    dir: TempDir,
}

impl Fixture {
    pub(crate) fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("tempdir"),
        }
    }

    pub(crate) fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    /// Writes a marked module manifest at `rel` with runtime dependencies `deps`.
    pub(crate) fn module(&self, rel: &str, name: &str, deps: &[&str]) -> PathBuf {
        let dependencies: Map<String, Value> =
            deps.iter().map(|d| ((*d).to_owned(), json!("*"))).collect();
        self.manifest(
            rel,
            &json!({
                "name": name,
                "version": "1.0.0",
                "stratum": {},
                "dependencies": dependencies,
            }),
        )
    }

    /// Writes an arbitrary manifest at `rel`.
    pub(crate) fn manifest(&self, rel: &str, manifest: &Value) -> PathBuf {
        let dir = self.path(rel);
        std::fs::create_dir_all(&dir).expect("create module dir");
        std::fs::write(
            dir.join("package.json"),
            serde_json::to_string_pretty(manifest).expect("encode manifest"),
        )
        .expect("write manifest");
        dir.canonicalize().expect("canonicalize")
    }

    pub(crate) fn canonical(path: &Path) -> PathBuf {
        path.canonicalize().expect("canonicalize")
    }
}

/// Reads manifests from disk and counts every read.
#[derive(Debug, Default)]
pub(crate) struct CountingManifests {
    reads: AtomicUsize,
}

impl CountingManifests {
    pub(crate) fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ManifestSource for CountingManifests {
    async fn read(&self, path: &Path) -> Result<Option<Manifest>, GraphError> {
        let _ = self.reads.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        DiskManifests.read(path).await
    }
}

//! Profile document storage.
//!
//! The portfolio profile is one JSON document on disk with last-write-wins
//! semantics. When no document has been saved yet, reads return a built-in
//! default so the frontend always has something to render.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde_json::{Value, json};

/// Read/write access to the profile document.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    path: PathBuf,
}

impl ProfileStore {
    /// Create a store backed by the given file path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a document has been saved.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read the stored document, or the default profile when none exists.
    pub async fn get(&self) -> anyhow::Result<Value> {
        if !self.exists() {
            tracing::debug!(
                name: "profile.read.default",
                path = %self.path.display(),
                "No stored profile, returning default document"
            );
            return Ok(default_profile());
        }

        let data = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("failed to read profile at {}", self.path.display()))?;
        let doc = serde_json::from_str(&data)
            .with_context(|| format!("profile at {} is not valid JSON", self.path.display()))?;

        tracing::debug!(
            name: "profile.read",
            path = %self.path.display(),
            bytes = data.len(),
            "Profile read"
        );
        Ok(doc)
    }

    /// Write the document, creating the parent directory on demand.
    pub async fn put(&self, doc: &Value) -> anyhow::Result<()> {
        if let Some(dir) = self.path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .with_context(|| format!("failed to create data dir {}", dir.display()))?;
        }

        let data = serde_json::to_string_pretty(doc)?;
        tokio::fs::write(&self.path, data)
            .await
            .with_context(|| format!("failed to write profile at {}", self.path.display()))?;

        tracing::info!(
            name: "profile.written",
            path = %self.path.display(),
            "Profile saved"
        );
        Ok(())
    }
}

/// The default profile document served before anything has been saved.
#[must_use]
pub fn default_profile() -> Value {
    json!({
        "full_name": "Your Name",
        "headline": "Your Professional Headline",
        "bio": "Your bio goes here...",
        "current_role": "",
        "current_company": "",
        "current_status": "Currently employed",
        "location": "",
        "email": "",
        "phone": "",
        "profile_image_url": "",
        "skills": [],
        "experience": [],
        "education": [],
        "certifications": [],
        "social_links": {}
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_file_returns_default() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProfileStore::new(dir.path().join("data/profile.json"));

        assert!(!store.exists());
        let doc = store.get().await.unwrap();
        assert_eq!(doc["full_name"], "Your Name");
        assert!(doc["skills"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_put_then_get_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProfileStore::new(dir.path().join("data/profile.json"));

        let doc = json!({ "full_name": "Ada Lovelace", "skills": ["Rust"] });
        store.put(&doc).await.unwrap();

        assert!(store.exists());
        assert_eq!(store.get().await.unwrap(), doc);
    }

    #[tokio::test]
    async fn test_last_write_wins() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProfileStore::new(dir.path().join("profile.json"));

        store.put(&json!({ "full_name": "First" })).await.unwrap();
        store.put(&json!({ "full_name": "Second" })).await.unwrap();
        assert_eq!(store.get().await.unwrap()["full_name"], "Second");
    }
}

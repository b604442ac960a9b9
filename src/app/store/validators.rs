//! Conditional-request validator tokens
//!
//! Tokens are kept per resource class so that a release-list ETag can never
//! be sent for an archive listing or a signature body. A fetch cycle works
//! on a staged copy obtained from [`ValidatorStore::snapshot`] and hands it
//! back through [`ValidatorStore::commit`] only when the cycle succeeded, so
//! the persisted tokens always describe the cached manifest.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, error};

use super::json_file::JsonFile;
use crate::errors::StoreResult;

/// Validator tokens for every upstream resource class
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ValidatorState {
    /// ETag of the release list
    pub releases: Option<String>,
    /// ETag of the archive listing, by release tag
    pub archives: HashMap<String, String>,
    /// ETag of each signature body, by download URL
    pub signatures: HashMap<String, String>,
    /// Completion time of the last successful fetch cycle
    pub last_fetch_time: Option<DateTime<Utc>>,
}

impl ValidatorState {
    pub fn release_token(&self) -> Option<&str> {
        self.releases.as_deref()
    }

    /// Record the release list ETag; `None` forgets the previous one
    pub fn set_release_token(&mut self, token: Option<impl Into<String>>) {
        self.releases = token.map(Into::into);
    }

    pub fn archive_token(&self, tag: &str) -> Option<&str> {
        self.archives.get(tag).map(String::as_str)
    }

    pub fn set_archive_token(&mut self, tag: &str, token: Option<impl Into<String>>) {
        set_or_clear(&mut self.archives, tag, token);
    }

    pub fn signature_token(&self, url: &str) -> Option<&str> {
        self.signatures.get(url).map(String::as_str)
    }

    pub fn set_signature_token(&mut self, url: &str, token: Option<impl Into<String>>) {
        set_or_clear(&mut self.signatures, url, token);
    }

    pub fn last_fetch_time(&self) -> Option<DateTime<Utc>> {
        self.last_fetch_time
    }

    pub fn set_last_fetch_time(&mut self, time: DateTime<Utc>) {
        self.last_fetch_time = Some(time);
    }

    /// Drop tokens of resources the current release no longer references
    ///
    /// Keeps the archive token of `tag` and the tokens of `signature_urls`.
    pub fn retain_current<'a>(
        &mut self,
        tag: &str,
        signature_urls: impl IntoIterator<Item = &'a str>,
    ) {
        let keep: HashSet<&str> = signature_urls.into_iter().collect();
        let before = self.archives.len() + self.signatures.len();

        self.archives.retain(|t, _| t == tag);
        self.signatures.retain(|url, _| keep.contains(url.as_str()));

        let dropped = before - self.archives.len() - self.signatures.len();
        if dropped > 0 {
            debug!("Dropped {} tokens of superseded resources", dropped);
        }
    }
}

fn set_or_clear(tokens: &mut HashMap<String, String>, key: &str, token: Option<impl Into<String>>) {
    match token {
        Some(token) => {
            tokens.insert(key.to_string(), token.into());
        }
        None => {
            tokens.remove(key);
        }
    }
}

/// In-memory validator state mirrored to `validators.json`
#[derive(Debug)]
pub struct ValidatorStore {
    state: RwLock<ValidatorState>,
    file: JsonFile<ValidatorState>,
}

impl ValidatorStore {
    /// Open the store, loading any persisted tokens
    pub async fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let file: JsonFile<ValidatorState> = JsonFile::open(path).await?;
        let state = file.load_or_default().await;
        debug!(
            "Loaded validators: release token {}, {} archive tokens, {} signature tokens",
            if state.releases.is_some() { "present" } else { "absent" },
            state.archives.len(),
            state.signatures.len()
        );
        Ok(Self {
            state: RwLock::new(state),
            file,
        })
    }

    /// Staged copy for a fetch cycle
    pub async fn snapshot(&self) -> ValidatorState {
        self.state.read().await.clone()
    }

    pub async fn last_fetch_time(&self) -> Option<DateTime<Utc>> {
        self.state.read().await.last_fetch_time()
    }

    /// Install the state produced by a successful cycle and persist it
    ///
    /// The in-memory state is replaced even if the write fails; the failure
    /// is logged and only affects durability.
    pub async fn commit(&self, state: ValidatorState) {
        {
            let mut current = self.state.write().await;
            *current = state.clone();
        }
        if let Err(e) = self.file.save(&state).await {
            error!("Failed to persist validator tokens: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_token_accessors() {
        let mut state = ValidatorState::default();
        assert_eq!(state.release_token(), None);

        state.set_release_token(Some("\"r1\""));
        state.set_archive_token("v1.0.0", Some("\"a1\""));
        state.set_signature_token("https://raw/App.msi.sig", Some("\"s1\""));

        assert_eq!(state.release_token(), Some("\"r1\""));
        assert_eq!(state.archive_token("v1.0.0"), Some("\"a1\""));
        assert_eq!(state.archive_token("v0.9.0"), None);
        assert_eq!(state.signature_token("https://raw/App.msi.sig"), Some("\"s1\""));
    }

    #[test]
    fn test_missing_etag_clears_token() {
        let mut state = ValidatorState::default();
        state.set_archive_token("v1", Some("\"a\""));
        state.set_archive_token("v1", Some("\"b\""));
        assert_eq!(state.archive_token("v1"), Some("\"b\""));

        state.set_archive_token("v1", None::<String>);
        state.set_release_token(None::<String>);
        assert!(state.archives.is_empty());
        assert_eq!(state.release_token(), None);
    }

    #[test]
    fn test_retain_current_drops_superseded_tokens() {
        let mut state = ValidatorState::default();
        state.set_archive_token("v1.0.0", Some("\"a1\""));
        state.set_archive_token("v1.1.0", Some("\"a2\""));
        state.set_signature_token("https://raw/v1.0.0/App.msi.sig", Some("\"s1\""));
        state.set_signature_token("https://raw/v1.1.0/App.msi.sig", Some("\"s2\""));

        state.retain_current("v1.1.0", ["https://raw/v1.1.0/App.msi.sig"]);

        assert_eq!(state.archives.len(), 1);
        assert_eq!(state.archive_token("v1.1.0"), Some("\"a2\""));
        assert_eq!(state.signatures.len(), 1);
        assert_eq!(state.signature_token("https://raw/v1.1.0/App.msi.sig"), Some("\"s2\""));
    }

    #[test]
    fn test_serialized_field_names() {
        let mut state = ValidatorState::default();
        state.set_last_fetch_time(Utc::now());
        let json = serde_json::to_value(&state).unwrap();
        assert!(json.get("lastFetchTime").is_some());
        assert!(json.get("archives").is_some());
        assert!(json.get("signatures").is_some());
    }

    #[tokio::test]
    async fn test_commit_persists_and_reloads() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("validators.json");

        let store = ValidatorStore::open(&path).await.unwrap();
        let mut staged = store.snapshot().await;
        staged.set_release_token(Some("\"r1\""));
        let now = Utc::now();
        staged.set_last_fetch_time(now);

        // Staged changes are invisible until committed
        assert_eq!(store.last_fetch_time().await, None);
        store.commit(staged).await;
        assert_eq!(store.last_fetch_time().await, Some(now));

        let reopened = ValidatorStore::open(&path).await.unwrap();
        assert_eq!(reopened.snapshot().await.release_token(), Some("\"r1\""));
        assert_eq!(reopened.last_fetch_time().await, Some(now));
    }
}

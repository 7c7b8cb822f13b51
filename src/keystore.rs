//! API-key persistence in a dotenv-style file.
//!
//! The key lives on a `GEMINI_API_KEY=<value>` line. Other lines of the file
//! are left untouched when the key is updated.

use crate::error::RedesignError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Default key file, relative to the working directory.
pub const DEFAULT_KEY_FILE: &str = ".env.local";

/// Variable name used both in the key file and in the process environment.
pub const API_KEY_VAR: &str = "GEMINI_API_KEY";

static KEY_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^GEMINI_API_KEY=([^\r\n]*)").expect("valid key-line regex"));

/// Reads and writes the API key in a dotenv-style file.
#[derive(Debug, Clone)]
pub struct ApiKeyStore {
    path: PathBuf,
}

impl Default for ApiKeyStore {
    fn default() -> Self {
        Self::new(DEFAULT_KEY_FILE)
    }
}

impl ApiKeyStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The stored key, or an empty string when the file or the line is absent.
    pub async fn get(&self) -> Result<String, RedesignError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Key file {} not found", self.path.display());
                return Ok(String::new());
            }
            Err(source) => {
                return Err(RedesignError::KeyStore {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        Ok(find_key(&content).unwrap_or_default())
    }

    /// Store `key`, replacing an existing key line or appending a new one.
    pub async fn set(&self, key: &str) -> Result<(), RedesignError> {
        let key = key.trim();
        if key.is_empty() {
            return Err(RedesignError::MissingApiKey);
        }

        let existing = match tokio::fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => String::new(),
            Err(source) => {
                return Err(RedesignError::KeyStore {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let updated = upsert_key(&existing, key);
        tokio::fs::write(&self.path, updated)
            .await
            .map_err(|source| RedesignError::KeyStore {
                path: self.path.clone(),
                source,
            })?;

        info!("API key saved to {}", self.path.display());
        Ok(())
    }
}

fn find_key(content: &str) -> Option<String> {
    KEY_LINE
        .captures(content)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|k| !k.is_empty())
}

fn upsert_key(content: &str, key: &str) -> String {
    let line = format!("{}={}", API_KEY_VAR, key);
    if KEY_LINE.is_match(content) {
        // `replace` only touches the first key line.
        return KEY_LINE.replace(content, regex::NoExpand(&line)).into_owned();
    }

    let eol = if content.contains("\r\n") { "\r\n" } else { "\n" };
    let mut out = content.to_string();
    if !out.is_empty() && !out.ends_with('\n') {
        out.push_str(eol);
    }
    out.push_str(&line);
    out.push_str(eol);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_key_reads_value() {
        assert_eq!(
            find_key("FOO=1\nGEMINI_API_KEY=abc123\nBAR=2\n"),
            Some("abc123".to_string())
        );
        assert_eq!(find_key("FOO=1\n"), None);
        assert_eq!(find_key("GEMINI_API_KEY=\n"), None);
        assert_eq!(find_key("# GEMINI_API_KEY=commented\n"), None);
    }

    #[test]
    fn upsert_replaces_in_place() {
        let updated = upsert_key("A=1\nGEMINI_API_KEY=old\nB=2\n", "new");
        assert_eq!(updated, "A=1\nGEMINI_API_KEY=new\nB=2\n");
    }

    #[test]
    fn upsert_appends_when_absent() {
        assert_eq!(upsert_key("A=1", "k"), "A=1\nGEMINI_API_KEY=k\n");
        assert_eq!(upsert_key("", "k"), "GEMINI_API_KEY=k\n");
    }

    #[test]
    fn crlf_line_endings_are_preserved() {
        let content = "A=1\r\nGEMINI_API_KEY=old\r\nB=2\r\n";
        assert_eq!(find_key(content), Some("old".to_string()));
        assert_eq!(
            upsert_key(content, "new"),
            "A=1\r\nGEMINI_API_KEY=new\r\nB=2\r\n"
        );
        assert_eq!(upsert_key("A=1\r\n", "k"), "A=1\r\nGEMINI_API_KEY=k\r\n");
    }

    #[test]
    fn upsert_keeps_dollar_signs_literal() {
        let updated = upsert_key("GEMINI_API_KEY=old\n", "a$1b");
        assert_eq!(updated, "GEMINI_API_KEY=a$1b\n");
    }

    #[test]
    fn missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = ApiKeyStore::new(dir.path().join(".env.local"));
        let key = tokio_test::block_on(store.get()).unwrap();
        assert!(key.is_empty());
    }

    #[tokio::test]
    async fn set_then_get_roundtrip_preserves_other_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env.local");
        std::fs::write(&path, "OTHER=x\n").unwrap();

        let store = ApiKeyStore::new(&path);
        store.set("first").await.unwrap();
        store.set("second").await.unwrap();

        assert_eq!(store.get().await.unwrap(), "second");
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "OTHER=x\nGEMINI_API_KEY=second\n"
        );
    }

    #[tokio::test]
    async fn blank_key_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = ApiKeyStore::new(dir.path().join(".env.local"));
        assert!(matches!(store.set("  ").await, Err(RedesignError::MissingApiKey)));
    }
}

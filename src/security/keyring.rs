//! Keyring integration for secure API key storage
//! Falls back to file storage if keyring is unavailable

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

const SERVICE_NAME: &str = "pref-learner";
const API_KEY_USERNAME: &str = "llm-api-key";
const API_KEY_FILE: &str = "api_key.txt";

/// Environment variable that overrides stored keys
pub const API_KEY_ENV: &str = "PREF_LEARNER_API_KEY";

/// Get the path for the fallback API key file
fn api_key_file_path() -> Result<PathBuf> {
    let dir = crate::config::config_dir()?;
    fs::create_dir_all(&dir).context("Failed to create config directory")?;
    Ok(dir.join(API_KEY_FILE))
}

/// Where a stored API key ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyLocation {
    Keyring,
    File(PathBuf),
}

/// Set API key - tries keyring first, falls back to file
pub fn set_api_key(key: &str) -> Result<()> {
    let location = store_api_key(key, keyring_store, &api_key_file_path()?)?;
    if let KeyLocation::File(path) = location {
        tracing::warn!("Keyring unavailable, API key stored in {}", path.display());
    }
    Ok(())
}

/// Store in the OS keyring and read it back through a fresh entry, so a
/// non-persistent backend counts as a failure
fn keyring_store(key: &str) -> keyring::Result<()> {
    keyring::Entry::new(SERVICE_NAME, API_KEY_USERNAME)?.set_password(key)?;
    let stored = keyring::Entry::new(SERVICE_NAME, API_KEY_USERNAME)?.get_password()?;
    if stored == key {
        Ok(())
    } else {
        Err(keyring::Error::NoEntry)
    }
}

/// Store through `store`, writing `fallback` only when it fails
fn store_api_key<F>(key: &str, store: F, fallback: &Path) -> Result<KeyLocation>
where
    F: FnOnce(&str) -> keyring::Result<()>,
{
    match store(key) {
        Ok(()) => Ok(KeyLocation::Keyring),
        Err(e) => {
            tracing::debug!("Keyring store failed: {}", e);
            save_to_file(key, fallback)?;
            Ok(KeyLocation::File(fallback.to_path_buf()))
        }
    }
}

fn save_to_file(key: &str, path: &Path) -> Result<()> {
    fs::write(path, key).context("Failed to write API key file")?;

    // Set restrictive permissions on Unix
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))
            .context("Failed to set file permissions")?;
    }

    Ok(())
}

/// Get API key - environment first, then keyring, then file
pub fn get_api_key() -> Result<String> {
    if let Ok(key) = std::env::var(API_KEY_ENV) {
        if !key.trim().is_empty() {
            return Ok(key.trim().to_string());
        }
    }

    if let Ok(entry) = keyring::Entry::new(SERVICE_NAME, API_KEY_USERNAME) {
        if let Ok(key) = entry.get_password() {
            return Ok(key);
        }
    }

    let path = api_key_file_path()?;
    let key = fs::read_to_string(&path).with_context(|| {
        format!(
            "No API key found. Set {} or run 'pref-learner config --set-api-key YOUR_KEY' first.",
            API_KEY_ENV
        )
    })?;
    Ok(key.trim().to_string())
}

/// Check if an API key is available from any source
pub fn has_api_key() -> bool {
    get_api_key().map(|k| !k.is_empty()).unwrap_or(false)
}

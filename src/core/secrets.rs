//! Keychain-backed secret storage and resolution.
//!
//! Pipeline files carry secret references, never values. Resolution happens
//! at job start: system keychain first (macOS Keychain, Linux Secret
//! Service, Windows Credential Manager), then a process-environment fallback
//! for headless runners. Resolved values stay in memory and are masked in
//! all rendered output.

use keyring::Entry;
use serde::Serialize;

use crate::core::error::{Error, Result};

const SERVICE_NAME: &str = "pipewright";

/// A reference to a stored secret, injected as `var` into step environments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretRef {
    pub key: String,
    pub var: String,
}

fn keyring_error(e: keyring::Error) -> Error {
    Error::secret_store_unavailable(format!("Keychain error: {}", e))
}

/// Stores a secret value in the keychain.
pub fn store(key: &str, value: &str) -> Result<()> {
    let entry = Entry::new(SERVICE_NAME, key).map_err(keyring_error)?;
    entry.set_password(value).map_err(keyring_error)?;
    Ok(())
}

/// Retrieves a secret from the keychain. Returns `None` if absent.
pub fn get(key: &str) -> Result<Option<String>> {
    let entry = Entry::new(SERVICE_NAME, key).map_err(keyring_error)?;

    match entry.get_password() {
        Ok(value) => Ok(Some(value)),
        Err(keyring::Error::NoEntry) => Ok(None),
        Err(e) => Err(keyring_error(e)),
    }
}

/// Deletes a secret from the keychain.
pub fn delete(key: &str) -> Result<()> {
    let entry = Entry::new(SERVICE_NAME, key).map_err(keyring_error)?;

    match entry.delete_credential() {
        Ok(()) => Ok(()),
        Err(keyring::Error::NoEntry) => Ok(()), // Already deleted
        Err(e) => Err(keyring_error(e)),
    }
}

/// Checks if a keychain entry exists.
pub fn exists(key: &str) -> bool {
    get(key).map(|v| v.is_some()).unwrap_or(false)
}

/// Process-environment fallback variable for a secret key.
/// `coveralls-token` becomes `PIPEWRIGHT_SECRET_COVERALLS_TOKEN`.
pub fn fallback_var_name(key: &str) -> String {
    format!(
        "PIPEWRIGHT_SECRET_{}",
        key.to_uppercase().replace('-', "_")
    )
}

/// Resolve a secret reference.
///
/// Keychain first; if the entry is absent or the store is unreachable, the
/// fallback environment variable is consulted. A reference that resolves
/// nowhere is an error carrying the migration hint.
pub fn resolve(secret_ref: &SecretRef) -> Result<String> {
    if let Ok(Some(value)) = get(&secret_ref.key) {
        return Ok(value);
    }

    let fallback = fallback_var_name(&secret_ref.key);
    if let Ok(value) = std::env::var(&fallback) {
        if !value.is_empty() {
            return Ok(value);
        }
    }

    Err(Error::secret_not_found(
        secret_ref.key.clone(),
        secret_ref.var.clone(),
        fallback,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_var_name_uppercases_and_replaces_dashes() {
        assert_eq!(
            fallback_var_name("coveralls-token"),
            "PIPEWRIGHT_SECRET_COVERALLS_TOKEN"
        );
        assert_eq!(fallback_var_name("gh_token"), "PIPEWRIGHT_SECRET_GH_TOKEN");
    }

    #[test]
    fn resolve_uses_environment_fallback() {
        std::env::set_var("PIPEWRIGHT_SECRET_TEST_FALLBACK_KEY", "sekrit");
        let value = resolve(&SecretRef {
            key: "test-fallback-key".to_string(),
            var: "TOKEN".to_string(),
        })
        .unwrap();
        assert_eq!(value, "sekrit");
        std::env::remove_var("PIPEWRIGHT_SECRET_TEST_FALLBACK_KEY");
    }

    #[test]
    fn resolve_reports_unresolvable_reference() {
        let err = resolve(&SecretRef {
            key: "test-definitely-missing-key".to_string(),
            var: "TOKEN".to_string(),
        })
        .unwrap_err();
        assert_eq!(err.code.as_str(), "secret.not_found");
        assert!(err.hints.iter().any(|h| h.message.contains("secret set")));
    }
}

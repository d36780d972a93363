//! Environment bundles: admin-uploaded variable maps that jobs reference by
//! an opaque `env_token` instead of embedding secrets in the job payload.

use rand::Rng;

use crate::error::CoreError;

/// Prefix of every env token.
pub const ENV_TOKEN_PREFIX: &str = "env_";

/// Number of hex characters after the prefix.
const ENV_TOKEN_HEX_LEN: usize = 32;

/// Maximum number of variables in one bundle.
const MAX_VARS: usize = 1024;

/// Generate a new env token (`env_` followed by 32 lowercase hex chars).
pub fn generate_env_token() -> String {
    let bytes: [u8; ENV_TOKEN_HEX_LEN / 2] = rand::rng().random();
    let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
    format!("{ENV_TOKEN_PREFIX}{hex}")
}

/// Validate the shape of an env token.
///
/// The token is used as part of a storage key, so anything outside the
/// generated alphabet is rejected.
pub fn validate_env_token(token: &str) -> Result<(), CoreError> {
    let valid = token
        .strip_prefix(ENV_TOKEN_PREFIX)
        .is_some_and(|hex| {
            hex.len() == ENV_TOKEN_HEX_LEN
                && hex.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
        });
    if valid {
        Ok(())
    } else {
        Err(CoreError::Validation(format!("Malformed env token '{token}'")))
    }
}

/// Validate an uploaded bundle: a JSON object with non-blank keys.
///
/// Values may be any JSON; agents render them into their own `.env` format.
pub fn validate_env_bundle(env: &serde_json::Value) -> Result<(), CoreError> {
    let obj = env
        .as_object()
        .ok_or_else(|| CoreError::Validation("Env bundle must be a JSON object".into()))?;

    if obj.len() > MAX_VARS {
        return Err(CoreError::Validation(format!(
            "Env bundle may hold at most {MAX_VARS} variables"
        )));
    }
    if let Some(key) = obj.keys().find(|k| k.trim().is_empty()) {
        return Err(CoreError::Validation(format!(
            "Env variable name must not be blank (got {key:?})"
        )));
    }
    Ok(())
}

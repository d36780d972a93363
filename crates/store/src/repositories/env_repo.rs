//! Repository for env bundles stored under `envs/<env_token>`.

use orch_core::env_bundle::{generate_env_token, validate_env_token};

use crate::error::{RepoError, StoreError};
use crate::Store;

/// Storage key of the bundle behind `token`.
pub fn env_key(token: &str) -> String {
    format!("envs/{token}")
}

/// Upload and lookup of env bundles.
pub struct EnvRepo;

impl EnvRepo {
    /// Store a validated bundle under a new token and return the token.
    pub async fn create(store: &Store, env: &serde_json::Value) -> Result<String, RepoError> {
        let txn = store.begin().await;

        let mut token = generate_env_token();
        while txn.exists(&env_key(&token)).await? {
            token = generate_env_token();
        }

        txn.save(&env_key(&token), env).await?;
        Ok(token)
    }

    /// Fetch the bundle behind `token`, or `None` if it was never uploaded.
    pub async fn find(
        store: &Store,
        token: &str,
    ) -> Result<Option<serde_json::Value>, RepoError> {
        validate_env_token(token)?;
        match store.read(&env_key(token)).await {
            Ok(env) => Ok(Some(env)),
            Err(StoreError::NotFound(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn exists(store: &Store, token: &str) -> Result<bool, RepoError> {
        Ok(Self::find(store, token).await?.is_some())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use assert_matches::assert_matches;
    use orch_core::error::CoreError;
    use serde_json::json;

    use super::*;
    use crate::backend::MemoryStore;

    #[tokio::test]
    async fn create_then_find_round_trips() {
        let store = Store::new(Arc::new(MemoryStore::new()));
        let env = json!({"DATABASE_URL": "postgres://db/app", "DEBUG": false});

        let token = EnvRepo::create(&store, &env).await.unwrap();

        assert!(validate_env_token(&token).is_ok());
        assert_eq!(EnvRepo::find(&store, &token).await.unwrap(), Some(env));
    }

    #[tokio::test]
    async fn unknown_token_is_none() {
        let store = Store::new(Arc::new(MemoryStore::new()));
        let token = generate_env_token();
        assert!(!EnvRepo::exists(&store, &token).await.unwrap());
    }

    #[tokio::test]
    async fn malformed_token_is_validation_error() {
        let store = Store::new(Arc::new(MemoryStore::new()));
        assert_matches!(
            EnvRepo::find(&store, "env_../agents").await,
            Err(RepoError::Core(CoreError::Validation(_)))
        );
    }
}

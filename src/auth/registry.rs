//! A concrete [`Authenticator`] backed by a HEAD probe against the object store, plus
//! home-tree provisioning on first successful login.
//!
//! The credential check is deliberately naive — presence of `auth/<user>_<pass>` as a key
//! is treated as proof of a valid credential; a real deployment would put a salted-hash
//! lookup behind the same trait.

use super::spi::{AuthError, Authenticator};
use super::user::User;
use crate::store::ObjectStore;
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
pub struct RegistryAuthenticator {
    store: Arc<dyn ObjectStore>,
    user_base_path: String,
    default_subdirectories: Vec<String>,
    create_default_subdirs: bool,
}

impl RegistryAuthenticator {
    pub fn new(store: Arc<dyn ObjectStore>, user_base_path: String, default_subdirectories: Vec<String>, create_default_subdirs: bool) -> Self {
        RegistryAuthenticator {
            store,
            user_base_path,
            default_subdirectories,
            create_default_subdirs,
        }
    }

    /// Ensures the user's home tree has its default subdirectory markers. Idempotent:
    /// re-writing an existing `.directory` marker is harmless.
    pub async fn provision_home(&self, user: &User) -> Result<(), crate::store::StoreError> {
        if !self.create_default_subdirs {
            return Ok(());
        }
        for name in &self.default_subdirectories {
            let key = format!("{}/{}/.directory", user.home_prefix, name);
            let body = format!("Directory marker for {} folder", name);
            self.store
                .put_with_content_type(&key, Bytes::from(body), "application/x-directory")
                .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Authenticator for RegistryAuthenticator {
    async fn authenticate(&self, username: &str, password: &str) -> Result<User, AuthError> {
        let probe_key = format!("auth/{}_{}", username, password);
        match self.store.head(&probe_key).await {
            Ok(Some(_)) => {
                info!(username, "authentication succeeded");
                let user = User::new(username, &self.user_base_path);
                if let Err(e) = self.provision_home(&user).await {
                    warn!(username, error = %e, "home provisioning failed");
                }
                Ok(user)
            }
            Ok(None) => Err(AuthError("unknown credentials".to_string())),
            Err(e) => {
                warn!(username, error = %e, "credential registry lookup failed");
                Err(AuthError("credential registry unavailable".to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn known_credential_succeeds() {
        let store: Arc<dyn ObjectStore> = Arc::new(MemoryStore::new());
        store.put("auth/alice_hunter2", Bytes::new()).await.unwrap();
        let auth = RegistryAuthenticator::new(store, "users".to_string(), vec!["invoices".into()], true);
        let user = auth.authenticate("alice", "hunter2").await.unwrap();
        assert_eq!(user.home_prefix, "users/alice");
    }

    #[tokio::test]
    async fn unknown_credential_fails() {
        let store: Arc<dyn ObjectStore> = Arc::new(MemoryStore::new());
        let auth = RegistryAuthenticator::new(store, "users".to_string(), vec![], true);
        assert!(auth.authenticate("alice", "wrong").await.is_err());
    }

    #[tokio::test]
    async fn provisioning_writes_marker_per_default_subdir() {
        let store = Arc::new(MemoryStore::new());
        let auth = RegistryAuthenticator::new(
            store.clone() as Arc<dyn ObjectStore>,
            "users".to_string(),
            vec!["invoices".into(), "ledgers".into()],
            true,
        );
        let user = User::new("alice", "users");
        auth.provision_home(&user).await.unwrap();
        assert!(store.head("users/alice/invoices/.directory").await.unwrap().is_some());
        assert!(store.head("users/alice/ledgers/.directory").await.unwrap().is_some());
        assert_eq!(
            store.content_type_of("users/alice/invoices/.directory").as_deref(),
            Some("application/x-directory")
        );
    }

    #[tokio::test]
    async fn provisioning_disabled_writes_nothing() {
        let store = Arc::new(MemoryStore::new());
        let auth = RegistryAuthenticator::new(store.clone() as Arc<dyn ObjectStore>, "users".to_string(), vec!["invoices".into()], false);
        let user = User::new("alice", "users");
        auth.provision_home(&user).await.unwrap();
        assert!(store.head("users/alice/invoices/.directory").await.unwrap().is_none());
    }
}

use std::collections::HashMap;

use async_trait::async_trait;
use rantboard_application::{CredentialRecord, CredentialRepository, NewCredential};
use rantboard_core::{AppError, AppResult};
use tokio::sync::RwLock;

/// In-memory credential store keyed by lowercase login.
#[derive(Default)]
pub struct InMemoryCredentialRepository {
    credentials: RwLock<HashMap<String, CredentialRecord>>,
}

impl InMemoryCredentialRepository {
    /// Creates an empty credential store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialRepository for InMemoryCredentialRepository {
    async fn find_by_login(&self, login: &str) -> AppResult<Option<CredentialRecord>> {
        let key = login.trim().to_lowercase();
        Ok(self.credentials.read().await.get(&key).cloned())
    }

    async fn create(&self, credential: NewCredential) -> AppResult<CredentialRecord> {
        let key = credential.login.trim().to_lowercase();
        let mut credentials = self.credentials.write().await;
        if credentials.contains_key(&key) {
            return Err(AppError::Conflict(format!(
                "login '{}' is already registered",
                credential.login
            )));
        }

        let record = CredentialRecord {
            subject: credential.subject,
            login: key.clone(),
            display_name: credential.display_name,
            password_hash: credential.password_hash,
            role: credential.role,
        };
        credentials.insert(key, record.clone());

        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use rantboard_application::{CredentialRepository, NewCredential};
    use rantboard_core::{AppError, AppResult, Role};

    use super::InMemoryCredentialRepository;

    fn credential(login: &str) -> NewCredential {
        NewCredential {
            subject: "s-1".to_owned(),
            login: login.to_owned(),
            display_name: "Someone".to_owned(),
            password_hash: "hash".to_owned(),
            role: Role::User,
        }
    }

    #[tokio::test]
    async fn lookup_ignores_case() -> AppResult<()> {
        let repository = InMemoryCredentialRepository::new();
        repository.create(credential("Sam@Example.com")).await?;

        let found = repository.find_by_login("sam@example.COM").await?;
        assert_eq!(found.map(|record| record.login), Some("sam@example.com".to_owned()));
        assert!(repository.find_by_login("other@example.com").await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn duplicate_login_conflicts() -> AppResult<()> {
        let repository = InMemoryCredentialRepository::new();
        repository.create(credential("admin")).await?;

        assert!(matches!(
            repository.create(credential("ADMIN")).await,
            Err(AppError::Conflict(_))
        ));
        Ok(())
    }
}

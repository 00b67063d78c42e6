//! account registration and login flows

use std::sync::Arc;

use hourglass_rs::SafeTimeProvider;
use tracing::info;

use crate::auth::{Claims, PasswordHasher, TokenIssuer};
use crate::errors::{Result, ServicingError};
use crate::ledger::{rollback_quietly, LedgerStore};
use crate::types::{NewAccount, Role, UserId};

/// registration and login over the ledger store and auth collaborators
pub struct AccountService {
    store: Arc<dyn LedgerStore>,
    hasher: Arc<dyn PasswordHasher>,
    tokens: Arc<dyn TokenIssuer>,
}

impl AccountService {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        hasher: Arc<dyn PasswordHasher>,
        tokens: Arc<dyn TokenIssuer>,
    ) -> Self {
        Self {
            store,
            hasher,
            tokens,
        }
    }

    /// register a customer account
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        time: &SafeTimeProvider,
    ) -> Result<UserId> {
        if self.store.account_by_email(email).await?.is_some() {
            return Err(ServicingError::EmailAlreadyRegistered);
        }

        let password_hash = self.hasher.hash(password)?;
        let account = NewAccount {
            email: email.to_string(),
            password_hash,
            role: Role::Customer,
            created_at: time.now(),
        };

        let mut tx = self.store.begin().await?;
        match tx.insert_account(&account).await {
            Ok(id) if id.is_nil() => {
                rollback_quietly(&mut *tx).await;
                Err(ServicingError::AccountCreationFailed)
            }
            Ok(id) => match tx.commit().await {
                Ok(()) => {
                    info!(user_id = %id, "account registered");
                    Ok(id)
                }
                Err(err) => {
                    rollback_quietly(&mut *tx).await;
                    Err(err.into())
                }
            },
            Err(err) => {
                rollback_quietly(&mut *tx).await;
                Err(err.into())
            }
        }
    }

    /// verify credentials and issue a session token
    pub async fn login(&self, email: &str, password: &str) -> Result<String> {
        let account = self
            .store
            .account_by_email(email)
            .await?
            .ok_or(ServicingError::EmailNotRegistered)?;

        self.hasher
            .verify(&account.password_hash, password)
            .map_err(|_| ServicingError::InvalidCredentials)?;

        let token = self.tokens.issue(&Claims {
            subject_id: account.id,
            role: account.role,
        })?;

        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{MockPasswordHasher, MockTokenIssuer};
    use crate::errors::AuthError;
    use crate::ledger::{LedgerTx, MockLedgerStore, MockLedgerTx};
    use crate::types::Account;
    use chrono::{TimeZone, Utc};
    use hourglass_rs::TimeSource;

    fn time_at_start() -> SafeTimeProvider {
        SafeTimeProvider::new(TimeSource::Test(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        ))
    }

    fn account(email: &str, hash: &str) -> Account {
        Account {
            id: UserId::new(),
            email: email.to_string(),
            password_hash: hash.to_string(),
            role: Role::Customer,
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    fn service(
        store: MockLedgerStore,
        hasher: MockPasswordHasher,
        tokens: MockTokenIssuer,
    ) -> AccountService {
        AccountService::new(Arc::new(store), Arc::new(hasher), Arc::new(tokens))
    }

    #[tokio::test]
    async fn test_register_inserts_hashed_customer_account() {
        let mut store = MockLedgerStore::new();
        store
            .expect_account_by_email()
            .times(1)
            .returning(|_| Ok(None));

        let mut tx = MockLedgerTx::new();
        tx.expect_insert_account()
            .withf(|a| {
                a.email == "user@example.com"
                    && a.password_hash == "hashed"
                    && a.role == Role::Customer
            })
            .times(1)
            .returning(|_| Ok(UserId::new()));
        tx.expect_commit().times(1).returning(|| Ok(()));
        store
            .expect_begin()
            .return_once(move || Ok(Box::new(tx) as Box<dyn LedgerTx>));

        let mut hasher = MockPasswordHasher::new();
        hasher
            .expect_hash()
            .times(1)
            .returning(|_| Ok("hashed".to_string()));

        let service = service(store, hasher, MockTokenIssuer::new());
        let id = service
            .register("user@example.com", "hunter2", &time_at_start())
            .await
            .unwrap();
        assert!(!id.is_nil());
    }

    #[tokio::test]
    async fn test_register_rejects_duplicate_email() {
        let mut store = MockLedgerStore::new();
        store
            .expect_account_by_email()
            .times(1)
            .returning(|_| Ok(Some(account("user@example.com", "hashed"))));

        let service = service(store, MockPasswordHasher::new(), MockTokenIssuer::new());
        let err = service
            .register("user@example.com", "hunter2", &time_at_start())
            .await
            .unwrap_err();
        assert!(matches!(err, ServicingError::EmailAlreadyRegistered));
    }

    #[tokio::test]
    async fn test_register_rolls_back_on_nil_account_id() {
        let mut store = MockLedgerStore::new();
        store
            .expect_account_by_email()
            .times(1)
            .returning(|_| Ok(None));

        let mut tx = MockLedgerTx::new();
        tx.expect_insert_account()
            .times(1)
            .returning(|_| Ok(UserId::nil()));
        tx.expect_rollback().times(1).returning(|| Ok(()));
        store
            .expect_begin()
            .return_once(move || Ok(Box::new(tx) as Box<dyn LedgerTx>));

        let mut hasher = MockPasswordHasher::new();
        hasher
            .expect_hash()
            .times(1)
            .returning(|_| Ok("hashed".to_string()));

        let service = service(store, hasher, MockTokenIssuer::new());
        let err = service
            .register("user@example.com", "hunter2", &time_at_start())
            .await
            .unwrap_err();
        assert!(matches!(err, ServicingError::AccountCreationFailed));
    }

    #[tokio::test]
    async fn test_login_issues_token_for_valid_credentials() {
        let stored = account("user@example.com", "hashed");
        let subject_id = stored.id;

        let mut store = MockLedgerStore::new();
        store
            .expect_account_by_email()
            .times(1)
            .returning(move |_| Ok(Some(stored.clone())));

        let mut hasher = MockPasswordHasher::new();
        hasher
            .expect_verify()
            .withf(|hash, password| hash == "hashed" && password == "hunter2")
            .times(1)
            .returning(|_, _| Ok(()));

        let mut tokens = MockTokenIssuer::new();
        tokens
            .expect_issue()
            .withf(move |claims| claims.subject_id == subject_id && claims.role == Role::Customer)
            .times(1)
            .returning(|_| Ok("signed-token".to_string()));

        let service = service(store, hasher, tokens);
        let token = service.login("user@example.com", "hunter2").await.unwrap();
        assert_eq!(token, "signed-token");
    }

    #[tokio::test]
    async fn test_login_unknown_email() {
        let mut store = MockLedgerStore::new();
        store
            .expect_account_by_email()
            .times(1)
            .returning(|_| Ok(None));

        let service = service(store, MockPasswordHasher::new(), MockTokenIssuer::new());
        let err = service
            .login("nobody@example.com", "hunter2")
            .await
            .unwrap_err();
        assert!(matches!(err, ServicingError::EmailNotRegistered));
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let mut store = MockLedgerStore::new();
        store
            .expect_account_by_email()
            .times(1)
            .returning(|_| Ok(Some(account("user@example.com", "hashed"))));

        let mut hasher = MockPasswordHasher::new();
        hasher
            .expect_verify()
            .times(1)
            .returning(|_, _| Err(AuthError::PasswordMismatch));

        let service = service(store, hasher, MockTokenIssuer::new());
        let err = service
            .login("user@example.com", "wrong")
            .await
            .unwrap_err();
        assert!(matches!(err, ServicingError::InvalidCredentials));
    }
}

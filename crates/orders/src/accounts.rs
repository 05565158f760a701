//! Profiles and credentials.

use common::UserId;
use domain::{Account, Credential, Profile, Role, user::normalize_email};
use projections::AccountView;
use store::{Store, Transaction};

use crate::error::{Result, ServiceError};

/// Display name given to a bootstrapped administrator.
const ADMIN_DISPLAY_NAME: &str = "Administrator";

/// Registers, resolves and administers users.
///
/// Credentials arrive already hashed; verifying them is left to the
/// authentication layer in front of this service. Accounts are never
/// deleted, only deactivated.
#[derive(Clone)]
pub struct AccountService<S> {
    store: S,
}

impl<S: Store> AccountService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Creates a profile and its credential. The email must not be registered yet.
    #[tracing::instrument(skip(self, password_hash))]
    pub async fn register(
        &self,
        display_name: &str,
        email: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<Profile> {
        let profile = Profile::new(display_name, role)?;
        let credential = Credential::new(profile.id, email, password_hash)?;

        let mut tx = self.store.begin().await?;
        tx.insert_user(&profile, &credential).await?;
        tx.commit().await?;

        tracing::info!(user_id = %profile.id, role = profile.role.as_str(), "user registered");
        Ok(profile)
    }

    pub async fn profile(&self, user_id: UserId) -> Result<Profile> {
        self.store
            .find_user(user_id)
            .await?
            .ok_or(ServiceError::UserNotFound(user_id))
    }

    /// Resolves a profile that may act: the account must exist and be active.
    pub async fn active_profile(&self, user_id: UserId) -> Result<Profile> {
        let account = self
            .store
            .find_account(user_id)
            .await?
            .ok_or(ServiceError::UserNotFound(user_id))?;
        if !account.is_active() {
            return Err(ServiceError::AccountInactive(user_id));
        }
        Ok(account.profile)
    }

    /// Changes the user's display name. A blank name keeps the current one.
    #[tracing::instrument(skip(self, display_name))]
    pub async fn update_profile(&self, user_id: UserId, display_name: &str) -> Result<Profile> {
        let account = self
            .modify(user_id, |account| account.profile.rename(display_name))
            .await?;
        Ok(account.profile)
    }

    /// Lists every account for administrators, sorted by email.
    pub async fn list_accounts(&self) -> Result<Vec<AccountView>> {
        let accounts = self.store.list_accounts().await?;
        Ok(accounts.iter().map(AccountView::from).collect())
    }

    /// Grants a role (`MEMBER` or `ADMIN`, case-insensitive).
    #[tracing::instrument(skip(self))]
    pub async fn set_role(&self, user_id: UserId, role: &str) -> Result<AccountView> {
        let role = Role::parse(role)?;
        let account = self
            .modify(user_id, |account| {
                let changed = account.profile.role != role;
                account.profile.role = role;
                changed
            })
            .await?;
        Ok(AccountView::from(&account))
    }

    /// Activates or deactivates an account. Deactivated users keep their
    /// orders and reviews but are refused by every authenticated endpoint.
    #[tracing::instrument(skip(self))]
    pub async fn set_active(&self, user_id: UserId, active: bool) -> Result<AccountView> {
        let account = self
            .modify(user_id, |account| {
                let changed = account.credential.active != active;
                account.credential.active = active;
                changed
            })
            .await?;
        Ok(AccountView::from(&account))
    }

    /// Locks an account, applies `change` and saves it when `change` reports a difference.
    async fn modify<F>(&self, user_id: UserId, change: F) -> Result<Account>
    where
        F: FnOnce(&mut Account) -> bool,
    {
        let mut tx = self.store.begin().await?;
        let mut account = tx
            .find_account_for_update(user_id)
            .await?
            .ok_or(ServiceError::UserNotFound(user_id))?;

        if !change(&mut account) {
            tracing::debug!("account unchanged");
            return Ok(account);
        }
        tx.save_account(&account).await?;
        tx.commit().await?;

        tracing::info!(
            role = account.profile.role.as_str(),
            active = account.is_active(),
            "account updated"
        );
        Ok(account)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<Profile>> {
        let email = normalize_email(email)?;
        Ok(self.store.find_user_by_email(&email).await?)
    }

    /// Creates an administrator for `email` unless an account with that email exists.
    ///
    /// Returns the new profile, or `None` when nothing was created.
    #[tracing::instrument(skip(self, password_hash))]
    pub async fn bootstrap_admin(&self, email: &str, password_hash: &str) -> Result<Option<Profile>> {
        if self.find_by_email(email).await?.is_some() {
            tracing::debug!("administrator already present");
            return Ok(None);
        }
        let profile = self
            .register(ADMIN_DISPLAY_NAME, email, password_hash, Role::Admin)
            .await?;
        Ok(Some(profile))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::ErrorKind;
    use store::InMemoryStore;

    #[tokio::test]
    async fn register_and_resolve() {
        let accounts = AccountService::new(InMemoryStore::new());
        let profile = accounts
            .register("Ada", " Ada@Example.com ", "hash", Role::Member)
            .await
            .unwrap();

        assert_eq!(accounts.profile(profile.id).await.unwrap(), profile);
        let by_email = accounts.find_by_email("ada@example.com").await.unwrap();
        assert_eq!(by_email, Some(profile));
    }

    #[tokio::test]
    async fn email_is_unique_case_insensitively() {
        let accounts = AccountService::new(InMemoryStore::new());
        accounts
            .register("Ada", "ada@example.com", "hash", Role::Member)
            .await
            .unwrap();

        let err = accounts
            .register("Imposter", "ADA@example.com", "hash", Role::Member)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn invalid_email_is_rejected() {
        let accounts = AccountService::new(InMemoryStore::new());
        let err = accounts
            .register("Ada", "not-an-email", "hash", Role::Member)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn bootstrap_admin_runs_once() {
        let accounts = AccountService::new(InMemoryStore::new());

        let created = accounts
            .bootstrap_admin("admin@example.com", "hash")
            .await
            .unwrap()
            .unwrap();
        assert!(created.is_admin());

        let again = accounts
            .bootstrap_admin("ADMIN@example.com", "hash")
            .await
            .unwrap();
        assert!(again.is_none());
    }

    #[tokio::test]
    async fn unknown_profile_is_not_found() {
        let accounts = AccountService::new(InMemoryStore::new());
        let result = accounts.profile(UserId::new()).await;
        assert!(matches!(result, Err(ServiceError::UserNotFound(_))));
    }

    #[tokio::test]
    async fn profile_update_ignores_blank_names() {
        let accounts = AccountService::new(InMemoryStore::new());
        let profile = accounts
            .register("Ada", "ada@example.com", "hash", Role::Member)
            .await
            .unwrap();

        let unchanged = accounts.update_profile(profile.id, "  ").await.unwrap();
        assert_eq!(unchanged.display_name, "Ada");

        let renamed = accounts
            .update_profile(profile.id, "Ada Lovelace")
            .await
            .unwrap();
        assert_eq!(renamed.display_name, "Ada Lovelace");
        assert_eq!(accounts.profile(profile.id).await.unwrap(), renamed);
    }

    #[tokio::test]
    async fn admin_can_change_role_and_deactivate() {
        let accounts = AccountService::new(InMemoryStore::new());
        let profile = accounts
            .register("Ada", "ada@example.com", "hash", Role::Member)
            .await
            .unwrap();

        let promoted = accounts.set_role(profile.id, "admin").await.unwrap();
        assert_eq!(promoted.role, Role::Admin);
        let bad_role = accounts.set_role(profile.id, "root").await.unwrap_err();
        assert_eq!(bad_role.kind(), ErrorKind::Validation);

        let deactivated = accounts.set_active(profile.id, false).await.unwrap();
        assert!(!deactivated.active);
        let result = accounts.active_profile(profile.id).await;
        assert!(matches!(result, Err(ServiceError::AccountInactive(_))));

        // Repeating the same change is a no-op.
        assert!(!accounts.set_active(profile.id, false).await.unwrap().active);

        accounts.set_active(profile.id, true).await.unwrap();
        assert!(accounts.active_profile(profile.id).await.unwrap().is_admin());
    }

    #[tokio::test]
    async fn accounts_are_listed_by_email() {
        let accounts = AccountService::new(InMemoryStore::new());
        for (name, email) in [("Zed", "zed@example.com"), ("Amy", "amy@example.com")] {
            accounts
                .register(name, email, "hash", Role::Member)
                .await
                .unwrap();
        }

        let listed = accounts.list_accounts().await.unwrap();
        let emails: Vec<_> = listed.iter().map(|a| a.email.as_str()).collect();
        assert_eq!(emails, ["amy@example.com", "zed@example.com"]);
        assert!(listed.iter().all(|a| a.active));

        let missing = accounts.set_active(UserId::new(), false).await;
        assert!(matches!(missing, Err(ServiceError::UserNotFound(_))));
    }
}

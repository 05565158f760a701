//! Account listing for administrators.

use common::UserId;
use domain::{Account, Role};
use serde::Serialize;

/// A user as administrators see it. The credential hash never leaves the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountView {
    pub user_id: UserId,
    pub display_name: String,
    pub email: String,
    pub role: Role,
    pub active: bool,
}

impl From<&Account> for AccountView {
    fn from(account: &Account) -> Self {
        Self {
            user_id: account.id(),
            display_name: account.profile.display_name.clone(),
            email: account.email().to_string(),
            role: account.profile.role,
            active: account.is_active(),
        }
    }
}

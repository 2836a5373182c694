//! Resolving the account imported contacts are written to.

use crate::model::Account;

/// Source of writable accounts, passed explicitly to whoever needs it.
pub trait AccountRegistry: Send + Sync {
    /// Accounts contacts can be written to.
    fn writable_accounts(&self) -> Vec<Account>;
}

/// Fixed account list.
#[derive(Debug, Clone, Default)]
pub struct StaticAccountRegistry {
    accounts: Vec<Account>,
}

impl StaticAccountRegistry {
    /// Registry serving `accounts`.
    #[must_use]
    pub const fn new(accounts: Vec<Account>) -> Self {
        Self { accounts }
    }
}

impl AccountRegistry for StaticAccountRegistry {
    fn writable_accounts(&self) -> Vec<Account> {
        self.accounts.clone()
    }
}

/// Result of account resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountChoice {
    /// Import into this account; `None` keeps contacts in phone-local storage.
    Use(Option<Account>),
    /// Several accounts qualify and the user must pick one.
    Choose(Vec<Account>),
}

/// Pick the target account for an import.
///
/// A complete `requested` account wins. Otherwise the registry decides: one
/// account is used directly, several need a choice, none means phone-local.
#[must_use]
pub fn resolve_account(requested: Option<Account>, registry: &dyn AccountRegistry) -> AccountChoice {
    if let Some(account) = requested.filter(Account::is_complete) {
        return AccountChoice::Use(Some(account));
    }
    let mut accounts = registry.writable_accounts();
    match accounts.len() {
        0 => AccountChoice::Use(None),
        1 => AccountChoice::Use(accounts.pop()),
        _ => AccountChoice::Choose(accounts),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(count: usize) -> StaticAccountRegistry {
        StaticAccountRegistry::new(
            (0..count)
                .map(|idx| Account::new(format!("user{idx}@example.com"), "com.example"))
                .collect(),
        )
    }

    #[test]
    fn requested_account_wins_when_complete() {
        let wanted = Account::new("me@example.com", "com.example");
        assert_eq!(
            resolve_account(Some(wanted.clone()), &registry(3)),
            AccountChoice::Use(Some(wanted))
        );
    }

    #[test]
    fn incomplete_request_falls_back_to_registry() {
        let partial = Account::new("me@example.com", "");
        assert_eq!(
            resolve_account(Some(partial), &registry(0)),
            AccountChoice::Use(None)
        );
        assert_eq!(
            resolve_account(None, &registry(1)),
            AccountChoice::Use(Some(Account::new("user0@example.com", "com.example")))
        );
        assert!(matches!(
            resolve_account(None, &registry(2)),
            AccountChoice::Choose(accounts) if accounts.len() == 2
        ));
    }
}

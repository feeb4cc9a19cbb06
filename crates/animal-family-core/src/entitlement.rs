//! Entitlement resolution.
//!
//! The resolved set is a pure function of the account row. The stored `role`
//! field is the only source of admin rights; there is no id allow-list here.

use serde::Serialize;

use crate::account::Account;
use crate::ids::AccountId;

/// The access rights of a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Entitlements {
    /// The caller's account, `None` for guests.
    pub account_id: Option<AccountId>,
    /// No verified identity.
    pub is_guest: bool,
    /// Holds the admin role.
    pub is_admin: bool,
    /// Paying member.
    pub is_premium: bool,
    /// Approved business operator.
    pub is_business_operator: bool,
}

impl Entitlements {
    /// The entitlement set of an unauthenticated caller.
    pub const GUEST: Self = Self {
        account_id: None,
        is_guest: true,
        is_admin: false,
        is_premium: false,
        is_business_operator: false,
    };

    /// Resolve the entitlements of an account (or a guest).
    #[must_use]
    pub fn resolve(account: Option<&Account>) -> Self {
        account.map_or(Self::GUEST, |account| Self {
            account_id: Some(account.account_id),
            is_guest: false,
            is_admin: account.is_admin(),
            is_premium: account.is_premium,
            is_business_operator: account.is_business_operator,
        })
    }
}

impl Default for Entitlements {
    fn default() -> Self {
        Self::GUEST
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::Role;
    use crate::identity::IdentityAssertion;

    fn account() -> Account {
        Account::new(&IdentityAssertion::new(1_046_439_138, "Nik", None, None).unwrap())
    }

    #[test]
    fn no_account_is_guest() {
        let e = Entitlements::resolve(None);
        assert!(e.is_guest);
        assert!(!e.is_admin && !e.is_premium && !e.is_business_operator);
        assert_eq!(e.account_id, None);
    }

    #[test]
    fn fresh_account_has_no_rights() {
        let a = account();
        let e = Entitlements::resolve(Some(&a));
        assert!(!e.is_guest);
        assert_eq!(e.account_id, Some(a.account_id));
        assert!(!e.is_admin && !e.is_premium && !e.is_business_operator);
    }

    #[test]
    fn admin_comes_from_role_only() {
        // This id was on the historical allow-list; without the role it is not admin.
        let mut a = account();
        assert!(!Entitlements::resolve(Some(&a)).is_admin);

        a.role = Role::Admin;
        assert!(Entitlements::resolve(Some(&a)).is_admin);
    }

    #[test]
    fn flags_are_read_directly() {
        let mut a = account();
        a.is_premium = true;
        a.is_business_operator = true;
        let e = Entitlements::resolve(Some(&a));
        assert!(e.is_premium);
        assert!(e.is_business_operator);
    }

    #[test]
    fn resolution_is_pure() {
        let mut a = account();
        a.is_premium = true;
        let first = Entitlements::resolve(Some(&a));
        let _ = Entitlements::resolve(None);
        let second = Entitlements::resolve(Some(&a));
        assert_eq!(first, second);
    }
}

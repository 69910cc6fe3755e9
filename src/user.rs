//! User identities.
//!
//! The host proxy treats accounts polymorphically; the inbound only needs a
//! small capability set (equality, conversion back to config form) over the
//! account kinds it knows. REFLEX accounts carry a 16-byte UUID and nothing
//! else — equality is by UUID only.

use uuid::Uuid;

use crate::config::ClientConfig;

/// Account identity, with variants over the known account kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Account {
    /// A REFLEX account, identified by its UUID
    Reflex {
        /// The user's UUID
        id: Uuid,
    },
}

impl Account {
    /// Compare identities. Accounts of different kinds never match.
    pub fn equals(&self, other: &Account) -> bool {
        match (self, other) {
            (Account::Reflex { id: a }, Account::Reflex { id: b }) => a == b,
        }
    }

    /// Render back into wire-config form.
    pub fn to_config(&self) -> ClientConfig {
        match self {
            Account::Reflex { id } => ClientConfig {
                id: id.to_string(),
                policy: None,
            },
        }
    }

    /// The UUID of a REFLEX account.
    pub fn uuid(&self) -> Uuid {
        match self {
            Account::Reflex { id } => *id,
        }
    }
}

/// A configured user: a display name plus its account identity.
#[derive(Debug, Clone)]
pub struct User {
    /// Display name (the configured id string)
    pub name: String,
    /// Account identity
    pub account: Account,
}

impl User {
    /// Build a REFLEX user from its UUID.
    pub fn reflex(id: Uuid) -> Self {
        Self {
            name: id.to_string(),
            account: Account::Reflex { id },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_equality_by_uuid() {
        let id = Uuid::new_v4();
        let a = Account::Reflex { id };
        let b = Account::Reflex { id };
        let c = Account::Reflex { id: Uuid::new_v4() };

        assert!(a.equals(&b));
        assert!(!a.equals(&c));
    }

    #[test]
    fn test_account_to_config_round_trip() {
        let id = Uuid::new_v4();
        let account = Account::Reflex { id };
        let config = account.to_config();

        assert_eq!(config.id, id.to_string());
        assert!(config.policy.is_none());
    }

    #[test]
    fn test_user_name_is_canonical_uuid() {
        let id = Uuid::new_v4();
        let user = User::reflex(id);
        assert_eq!(user.name, id.to_string());
        assert_eq!(user.account.uuid(), id);
    }
}

//! Privileges attached to database and table descriptors
//!
//! Every descriptor carries a [`PrivilegeDescriptor`] mapping user names to the
//! privileges granted on that object. `ALL` subsumes every other privilege.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// The superuser. Always holds `ALL` on every descriptor it creates.
pub const ROOT_USER: &str = "root";

/// Privilege kinds that can be granted on databases and tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Privilege {
    /// Every privilege below
    All,
    /// Create objects inside a database
    Create,
    /// Drop the object
    Drop,
    /// Grant privileges on the object to others
    Grant,
    /// Read rows
    Select,
    /// Add rows
    Insert,
    /// Remove rows
    Delete,
    /// Modify rows
    Update,
}

impl Privilege {
    /// Parse a privilege name (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "ALL" => Some(Privilege::All),
            "CREATE" => Some(Privilege::Create),
            "DROP" => Some(Privilege::Drop),
            "GRANT" => Some(Privilege::Grant),
            "SELECT" => Some(Privilege::Select),
            "INSERT" => Some(Privilege::Insert),
            "DELETE" => Some(Privilege::Delete),
            "UPDATE" => Some(Privilege::Update),
            _ => None,
        }
    }

    /// Canonical upper-case name
    pub fn as_str(&self) -> &'static str {
        match self {
            Privilege::All => "ALL",
            Privilege::Create => "CREATE",
            Privilege::Drop => "DROP",
            Privilege::Grant => "GRANT",
            Privilege::Select => "SELECT",
            Privilege::Insert => "INSERT",
            Privilege::Delete => "DELETE",
            Privilege::Update => "UPDATE",
        }
    }

    /// Individual privileges that `ALL` expands to
    pub fn expand_all() -> [Privilege; 7] {
        [
            Privilege::Create,
            Privilege::Drop,
            Privilege::Grant,
            Privilege::Select,
            Privilege::Insert,
            Privilege::Delete,
            Privilege::Update,
        ]
    }
}

impl fmt::Display for Privilege {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-object grants: user name -> granted privileges
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivilegeDescriptor {
    users: BTreeMap<String, BTreeSet<Privilege>>,
}

impl PrivilegeDescriptor {
    /// Descriptor granting `ALL` to root only
    pub fn new_default() -> Self {
        let mut desc = Self::default();
        desc.grant(ROOT_USER, &[Privilege::All]);
        desc
    }

    /// Grant privileges to a user. Granting `ALL` collapses the set.
    pub fn grant(&mut self, user: &str, privileges: &[Privilege]) {
        let set = self.users.entry(user.to_string()).or_default();
        if set.contains(&Privilege::All) {
            return;
        }
        if privileges.contains(&Privilege::All) {
            set.clear();
            set.insert(Privilege::All);
            return;
        }
        set.extend(privileges.iter().copied());
    }

    /// Revoke privileges from a user. Revoking one privilege out of `ALL`
    /// leaves the remaining individual privileges in place.
    pub fn revoke(&mut self, user: &str, privileges: &[Privilege]) {
        let Some(set) = self.users.get_mut(user) else {
            return;
        };
        if privileges.contains(&Privilege::All) {
            self.users.remove(user);
            return;
        }
        if set.remove(&Privilege::All) {
            set.extend(Privilege::expand_all());
        }
        for privilege in privileges {
            set.remove(privilege);
        }
        if set.is_empty() {
            self.users.remove(user);
        }
    }

    /// Whether the user holds any privilege at all
    pub fn any_privilege(&self, user: &str) -> bool {
        self.users.get(user).is_some_and(|set| !set.is_empty())
    }

    /// Whether the user holds the given privilege, directly or through `ALL`
    pub fn check(&self, user: &str, privilege: Privilege) -> bool {
        self.users
            .get(user)
            .is_some_and(|set| set.contains(&Privilege::All) || set.contains(&privilege))
    }

    /// (user, privilege) pairs in user order
    pub fn grants(&self) -> impl Iterator<Item = (&str, Privilege)> + '_ {
        self.users
            .iter()
            .flat_map(|(user, set)| set.iter().map(move |p| (user.as_str(), *p)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_grants_root_all() {
        let desc = PrivilegeDescriptor::new_default();
        assert!(desc.check(ROOT_USER, Privilege::Select));
        assert!(desc.any_privilege(ROOT_USER));
        assert!(!desc.any_privilege("alice"));
    }

    #[test]
    fn test_grant_and_revoke() {
        let mut desc = PrivilegeDescriptor::new_default();
        desc.grant("alice", &[Privilege::Select, Privilege::Insert]);
        assert!(desc.check("alice", Privilege::Insert));
        assert!(!desc.check("alice", Privilege::Drop));

        desc.revoke("alice", &[Privilege::Insert]);
        assert!(!desc.check("alice", Privilege::Insert));
        assert!(desc.any_privilege("alice"));

        desc.revoke("alice", &[Privilege::Select]);
        assert!(!desc.any_privilege("alice"));
    }

    #[test]
    fn test_revoke_from_all_expands() {
        let mut desc = PrivilegeDescriptor::default();
        desc.grant("bob", &[Privilege::All]);
        desc.revoke("bob", &[Privilege::Drop]);
        assert!(desc.check("bob", Privilege::Select));
        assert!(!desc.check("bob", Privilege::Drop));
        assert!(!desc.check("bob", Privilege::All));
    }

    #[test]
    fn test_grants_listing() {
        let mut desc = PrivilegeDescriptor::new_default();
        desc.grant("alice", &[Privilege::Select]);
        let grants: Vec<_> = desc.grants().collect();
        assert_eq!(
            grants,
            vec![("alice", Privilege::Select), ("root", Privilege::All)]
        );
    }
}

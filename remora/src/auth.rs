//! The credential store used for SOCKS5 username/password
//! authentication.

use remora_socksproto::Authenticator;

use anyhow::{anyhow, Result};
use std::collections::BTreeSet;

/// A set of username/password pairs that are allowed to use the proxy.
///
/// The store is filled while reading the configuration and never
/// changes afterwards: sessions share one instance behind an `Arc`
/// and only ever read from it.
#[derive(Debug, Default)]
pub(crate) struct CredentialStore {
    /// The accepted pairs.
    credentials: BTreeSet<(String, String)>,
}

impl CredentialStore {
    /// Parse a `user:pass[,user:pass]*` specification, as found in the
    /// `credentials` configuration key.
    pub(crate) fn from_spec(spec: &str) -> Result<Self> {
        let mut store = CredentialStore::default();
        for pair in spec.split(',') {
            let mut fields = pair.splitn(2, ':');
            match (fields.next(), fields.next()) {
                (Some(user), Some(pass)) if !user.is_empty() => {
                    store.add(user, pass);
                }
                _ => {
                    return Err(anyhow!("Invalid credentials entry {:?}", pair));
                }
            }
        }
        Ok(store)
    }

    /// Add a single username/password pair to this store.
    pub(crate) fn add(&mut self, username: &str, password: &str) {
        self.credentials
            .insert((username.to_string(), password.to_string()));
    }

    /// Return true if `username` and `password` name a pair in this store.
    pub(crate) fn validate(&self, username: &str, password: &str) -> bool {
        self.credentials
            .contains(&(username.to_string(), password.to_string()))
    }

    /// Return the number of pairs in this store.
    pub(crate) fn len(&self) -> usize {
        self.credentials.len()
    }
}

impl Authenticator for CredentialStore {
    fn check(&self, username: &[u8], password: &[u8]) -> bool {
        // Credentials that aren't UTF-8 can't be in the store, since
        // it is built from the configuration file.
        match (std::str::from_utf8(username), std::str::from_utf8(password)) {
            (Ok(user), Ok(pass)) => self.validate(user, pass),
            _ => false,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn spec_parsing() {
        let store = CredentialStore::from_spec("alice:opensesame,bob:hunter2").unwrap();
        assert_eq!(store.len(), 2);
        assert!(store.validate("alice", "opensesame"));
        assert!(store.validate("bob", "hunter2"));
        assert!(!store.validate("alice", "hunter2"));
        assert!(!store.validate("mallory", "opensesame"));

        // A colon inside the password belongs to the password.
        let store = CredentialStore::from_spec("carol:se:cret").unwrap();
        assert!(store.validate("carol", "se:cret"));
    }

    #[test]
    fn bad_specs() {
        assert!(CredentialStore::from_spec("").is_err());
        assert!(CredentialStore::from_spec("nocolon").is_err());
        assert!(CredentialStore::from_spec(":nopassword").is_err());
        assert!(CredentialStore::from_spec("alice:ok,bad").is_err());
    }

    #[test]
    fn byte_interface() {
        let store = CredentialStore::from_spec("alice:opensesame").unwrap();
        assert!(store.check(b"alice", b"opensesame"));
        assert!(!store.check(b"alice", b"wrong"));
        assert!(!store.check(b"\xFF\xFE", b"opensesame"));
    }
}

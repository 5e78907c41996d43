//! Credential hashing.
//!
//! Secrets are hashed with argon2id into PHC strings. Plaintext never
//! leaves the call that hashes it: [`Credential`] only ever holds a digest.

use std::fmt;

use argon2::{Algorithm, Argon2, Params, PasswordHasher, PasswordVerifier, Version};
use password_hash::{PasswordHash, SaltString};
use serde::Deserialize;

use crate::auth::error::AuthError;

/// Work factor for the argon2id hasher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HashCost {
    /// Memory cost in KiB
    pub memory_kib: u32,
    /// Number of passes
    pub iterations: u32,
    /// Degree of parallelism
    pub parallelism: u32,
}

impl HashCost {
    pub fn new(memory_kib: u32, iterations: u32, parallelism: u32) -> Self {
        Self {
            memory_kib,
            iterations,
            parallelism,
        }
    }
}

impl Default for HashCost {
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

/// Stored one-way digest of a secret (PHC string format).
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordDigest(String);

impl PasswordDigest {
    /// Wrap an already-computed PHC string, e.g. one read back from storage.
    pub fn from_phc(phc: impl Into<String>) -> Self {
        Self(phc.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PasswordDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PasswordDigest(..)")
    }
}

/// One-way hash and verify of user secrets.
pub trait CredentialHasher: Send + Sync {
    /// Produce a salted digest of `secret`.
    fn hash(&self, secret: &str) -> Result<PasswordDigest, AuthError>;

    /// Check `secret` against a stored digest. Malformed digests never match.
    fn verify(&self, secret: &str, digest: &PasswordDigest) -> bool;
}

/// argon2id implementation of [`CredentialHasher`].
#[derive(Clone)]
pub struct Argon2Hasher {
    argon2: Argon2<'static>,
    cost: HashCost,
}

impl Argon2Hasher {
    pub fn new(cost: HashCost) -> Result<Self, AuthError> {
        let params = Params::new(cost.memory_kib, cost.iterations, cost.parallelism, None)
            .map_err(|e| AuthError::Hashing(e.to_string()))?;
        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
            cost,
        })
    }

    pub fn cost(&self) -> HashCost {
        self.cost
    }
}

impl fmt::Debug for Argon2Hasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Argon2Hasher")
            .field("cost", &self.cost)
            .finish()
    }
}

impl CredentialHasher for Argon2Hasher {
    fn hash(&self, secret: &str) -> Result<PasswordDigest, AuthError> {
        let mut salt_bytes = [0u8; 16];
        getrandom::getrandom(&mut salt_bytes).map_err(|e| AuthError::Hashing(e.to_string()))?;
        let salt =
            SaltString::encode_b64(&salt_bytes).map_err(|e| AuthError::Hashing(e.to_string()))?;
        let phc = self
            .argon2
            .hash_password(secret.as_bytes(), &salt)
            .map_err(|e| AuthError::Hashing(e.to_string()))?
            .to_string();
        Ok(PasswordDigest(phc))
    }

    fn verify(&self, secret: &str, digest: &PasswordDigest) -> bool {
        match PasswordHash::new(digest.as_str()) {
            Ok(parsed) => self
                .argon2
                .verify_password(secret.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    }
}

/// Secret/hash pair owned by a user record.
///
/// Holds only the digest. Replacing the secret re-hashes it; a failed hash
/// leaves the existing credential untouched.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    digest: PasswordDigest,
}

impl Credential {
    /// Hash `secret` into a new credential.
    pub fn new(hasher: &dyn CredentialHasher, secret: &str) -> Result<Self, AuthError> {
        Ok(Self {
            digest: hasher.hash(secret)?,
        })
    }

    pub fn from_digest(digest: PasswordDigest) -> Self {
        Self { digest }
    }

    /// Swap in a new secret.
    pub fn replace_secret(
        &mut self,
        hasher: &dyn CredentialHasher,
        secret: &str,
    ) -> Result<(), AuthError> {
        let digest = hasher.hash(secret)?;
        self.digest = digest;
        Ok(())
    }

    pub fn matches(&self, hasher: &dyn CredentialHasher, secret: &str) -> bool {
        hasher.verify(secret, &self.digest)
    }

    pub fn digest(&self) -> &PasswordDigest {
        &self.digest
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(..)")
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Cheap parameters so the suite stays fast.
    pub(crate) fn fast_hasher() -> Argon2Hasher {
        Argon2Hasher::new(HashCost::new(1024, 1, 1)).unwrap()
    }

    /// Hasher whose entropy source is "broken".
    pub(crate) struct FailingHasher;

    impl CredentialHasher for FailingHasher {
        fn hash(&self, _secret: &str) -> Result<PasswordDigest, AuthError> {
            Err(AuthError::Hashing("entropy source unavailable".to_string()))
        }

        fn verify(&self, _secret: &str, _digest: &PasswordDigest) -> bool {
            false
        }
    }

    #[test]
    fn test_hash_then_verify() {
        let hasher = fast_hasher();
        let digest = hasher.hash("test123!@#").unwrap();

        assert!(hasher.verify("test123!@#", &digest));
        assert!(!hasher.verify("test123!@", &digest));
        assert!(!hasher.verify("", &digest));
    }

    #[test]
    fn test_digest_is_not_plaintext_and_is_salted() {
        let hasher = fast_hasher();
        let first = hasher.hash("hunter2").unwrap();
        let second = hasher.hash("hunter2").unwrap();

        assert!(!first.as_str().contains("hunter2"));
        assert!(first.as_str().starts_with("$argon2id$"));
        assert_ne!(first, second);
        assert!(hasher.verify("hunter2", &second));
    }

    #[test]
    fn test_verify_malformed_digest() {
        let hasher = fast_hasher();
        assert!(!hasher.verify("secret", &PasswordDigest::from_phc("not-a-phc-string")));
        assert!(!hasher.verify("secret", &PasswordDigest::from_phc("secret")));
    }

    #[test]
    fn test_digest_verifies_across_cost_settings() {
        let digest = fast_hasher().hash("secret").unwrap();
        let other = Argon2Hasher::new(HashCost::new(2048, 2, 1)).unwrap();
        assert!(other.verify("secret", &digest));
    }

    #[test]
    fn test_invalid_cost_rejected() {
        let result = Argon2Hasher::new(HashCost::new(1024, 0, 1));
        assert!(matches!(result, Err(AuthError::Hashing(_))));
    }

    #[test]
    fn test_default_cost() {
        let cost = HashCost::default();
        assert_eq!(cost.memory_kib, 19 * 1024);
        assert_eq!(cost.iterations, 2);
        assert_eq!(cost.parallelism, 1);
    }

    #[test]
    fn test_credential_replace_secret() {
        let hasher = fast_hasher();
        let mut credential = Credential::new(&hasher, "old-secret").unwrap();
        assert!(credential.matches(&hasher, "old-secret"));

        credential.replace_secret(&hasher, "new-secret").unwrap();
        assert!(credential.matches(&hasher, "new-secret"));
        assert!(!credential.matches(&hasher, "old-secret"));
    }

    #[test]
    fn test_failed_hash_keeps_previous_credential() {
        let hasher = fast_hasher();
        let mut credential = Credential::new(&hasher, "old-secret").unwrap();

        let result = credential.replace_secret(&FailingHasher, "new-secret");
        assert!(matches!(result, Err(AuthError::Hashing(_))));
        assert!(credential.matches(&hasher, "old-secret"));
    }

    #[test]
    fn test_debug_is_redacted() {
        let hasher = fast_hasher();
        let credential = Credential::new(&hasher, "secret").unwrap();
        assert_eq!(format!("{:?}", credential), "Credential(..)");
        assert_eq!(format!("{:?}", credential.digest()), "PasswordDigest(..)");
    }
}

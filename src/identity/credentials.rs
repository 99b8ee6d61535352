use anyhow::{anyhow, Result};
use argon2::{Algorithm, Argon2, Params, PasswordHasher, PasswordVerifier, Version};
use password_hash::{PasswordHash, SaltString};

/// Hash `password` into an Argon2 PHC string with a random salt.
pub fn hash_password(argon2: &Argon2<'_>, password: &str) -> Result<String> {
    let mut salt_bytes = [0u8; 16];
    getrandom::getrandom(&mut salt_bytes).map_err(|e| anyhow!(e.to_string()))?;
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| anyhow!(e.to_string()))?;
    let phc = argon2.hash_password(password.as_bytes(), &salt).map_err(|e| anyhow!(e.to_string()))?.to_string();
    Ok(phc)
}

/// Check `password` against a PHC string; parameters are read from the hash itself.
pub fn verify_password(hash: &str, password: &str) -> bool {
    if let Ok(parsed) = PasswordHash::new(hash) {
        Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok()
    } else { false }
}

/// The single operator account. The plaintext password is hashed once at startup and
/// never retained.
#[derive(Clone)]
pub struct OperatorCredentials {
    user: String,
    phc: String,
}

impl std::fmt::Debug for OperatorCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperatorCredentials").field("user", &self.user).finish_non_exhaustive()
    }
}

impl OperatorCredentials {
    pub fn new(user: &str, password: &str) -> Result<Self> {
        Self::with_hasher(&Argon2::default(), user, password)
    }

    /// Cheap parameters for tests; not for production use.
    pub fn new_insecure_fast(user: &str, password: &str) -> Result<Self> {
        let params = Params::new(1024, 1, 1, None).map_err(|e| anyhow!(e.to_string()))?;
        Self::with_hasher(&Argon2::new(Algorithm::Argon2id, Version::V0x13, params), user, password)
    }

    fn with_hasher(argon2: &Argon2<'_>, user: &str, password: &str) -> Result<Self> {
        if user.is_empty() { return Err(anyhow!("operator user cannot be empty")); }
        Ok(Self { user: user.to_string(), phc: hash_password(argon2, password)? })
    }

    pub fn user(&self) -> &str { &self.user }

    pub fn verify(&self, user: &str, password: &str) -> bool {
        let ok = verify_password(&self.phc, password);
        ok && user == self.user
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verifies_only_matching_pair() {
        let c = OperatorCredentials::new_insecure_fast("admin", "s3cret").unwrap();
        assert!(c.verify("admin", "s3cret"));
        assert!(!c.verify("admin", "wrong"));
        assert!(!c.verify("root", "s3cret"));
        assert!(!format!("{:?}", c).contains("argon2"));
    }

    #[test]
    fn phc_is_salted() {
        let a = Argon2::default();
        let h1 = hash_password(&a, "pw").unwrap();
        let h2 = hash_password(&a, "pw").unwrap();
        assert_ne!(h1, h2);
        assert!(h1.starts_with("$argon2id$"));
        assert!(verify_password(&h1, "pw"));
        assert!(!verify_password("not-a-phc", "pw"));
    }
}

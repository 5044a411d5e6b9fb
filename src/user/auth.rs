//! Password hashing.

use anyhow::{bail, Result};
use std::str::FromStr;

mod pezzottify_argon2 {
    use anyhow::{anyhow, Result};
    use argon2::{
        password_hash::{
            rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
        },
        Argon2,
    };

    pub fn hash(plain: &[u8]) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash_string = Argon2::default()
            .hash_password(plain, &salt)
            .map_err(|err| anyhow!("{}", err))?
            .to_string();
        Ok(hash_string)
    }

    pub fn verify(plain_pw: &[u8], target_hash: &str) -> Result<bool> {
        let password_hash = PasswordHash::new(target_hash).map_err(|err| anyhow!("{}", err))?;
        Ok(Argon2::default()
            .verify_password(plain_pw, &password_hash)
            .is_ok())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CredentialHasher {
    Argon2,
    /// Fast test-only hasher - DO NOT use in production!
    #[cfg(feature = "test-fast-hasher")]
    TestFast,
}

impl Default for CredentialHasher {
    fn default() -> Self {
        #[cfg(feature = "test-fast-hasher")]
        return CredentialHasher::TestFast;
        #[cfg(not(feature = "test-fast-hasher"))]
        return CredentialHasher::Argon2;
    }
}

impl FromStr for CredentialHasher {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "argon2" => Ok(CredentialHasher::Argon2),
            #[cfg(feature = "test-fast-hasher")]
            "test_fast" => Ok(CredentialHasher::TestFast),
            _ => bail!("Unknown hasher {}", s),
        }
    }
}

impl std::fmt::Display for CredentialHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CredentialHasher::Argon2 => write!(f, "argon2"),
            #[cfg(feature = "test-fast-hasher")]
            CredentialHasher::TestFast => write!(f, "test_fast"),
        }
    }
}

impl CredentialHasher {
    /// Hashes with a fresh random salt; the salt is part of the returned string.
    pub fn hash(&self, plain: &str) -> Result<String> {
        match self {
            CredentialHasher::Argon2 => pezzottify_argon2::hash(plain.as_bytes()),
            #[cfg(feature = "test-fast-hasher")]
            CredentialHasher::TestFast => {
                let hex: String = plain.bytes().map(|b| format!("{:02x}", b)).collect();
                Ok(format!("$testfast${}", hex))
            }
        }
    }

    pub fn verify(&self, plain: &str, target_hash: &str) -> Result<bool> {
        match self {
            CredentialHasher::Argon2 => pezzottify_argon2::verify(plain.as_bytes(), target_hash),
            #[cfg(feature = "test-fast-hasher")]
            CredentialHasher::TestFast => {
                let expected: String = plain.bytes().map(|b| format!("{:02x}", b)).collect();
                Ok(target_hash.strip_prefix("$testfast$") == Some(expected.as_str()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argon2_hash_and_verify() {
        let hash1 = CredentialHasher::Argon2.hash("123mypw").unwrap();
        let hash2 = CredentialHasher::Argon2.hash("123mypw").unwrap();

        assert!(hash1.starts_with("$argon2"));
        assert_ne!(hash1, "123mypw");
        // Salted, so the same password never hashes twice to the same string.
        assert_ne!(hash1, hash2);

        assert!(CredentialHasher::Argon2.verify("123mypw", &hash1).unwrap());
        assert!(CredentialHasher::Argon2.verify("123mypw", &hash2).unwrap());
        assert!(!CredentialHasher::Argon2.verify("not the pw", &hash1).unwrap());
    }

    #[test]
    fn argon2_rejects_garbage_hash() {
        assert!(CredentialHasher::Argon2.verify("pw", "plaintext").is_err());
    }

    #[test]
    fn hasher_name_round_trips() {
        let name = CredentialHasher::Argon2.to_string();
        assert_eq!(name, "argon2");
        assert_eq!(
            name.parse::<CredentialHasher>().unwrap(),
            CredentialHasher::Argon2
        );
        assert!("md5".parse::<CredentialHasher>().is_err());
    }
}

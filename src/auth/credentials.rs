//! Credential verification and hashing
//!
//! A stored secret is either a plaintext password or a salted hash written as
//! `salt!hexdigest`, where the digest is SHA-256 over the password followed by
//! the salt. The two forms are told apart by shape: a hashed secret is an
//! alphabetic salt, one `!`, and exactly [`DIGEST_HEX_LEN`] lowercase hex digits.

use log::trace;
use rand::Rng;
use sha2::{Digest, Sha256};

/// Length of a hex-encoded SHA-256 digest
pub const DIGEST_HEX_LEN: usize = 64;

/// Number of characters in a generated salt
pub const SALT_LEN: usize = 8;

const SALT_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Stored secret, classified
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Secret<'a> {
    Plain(&'a str),
    Hashed { salt: &'a str, digest: &'a str },
}

impl<'a> Secret<'a> {
    pub fn classify(raw: &'a str) -> Self {
        if is_hashed(raw) {
            if let Some((salt, digest)) = raw.split_once('!') {
                return Secret::Hashed { salt, digest };
            }
        }
        Secret::Plain(raw)
    }
}

/// Whether `raw` has the `salt!hexdigest` shape.
pub fn is_hashed(raw: &str) -> bool {
    match raw.split_once('!') {
        Some((salt, digest)) => {
            !salt.is_empty()
                && salt.bytes().all(|b| b.is_ascii_alphabetic())
                && digest.len() == DIGEST_HEX_LEN
                && digest.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
        }
        None => false,
    }
}

/// Hex digest of `password` mixed with `salt`.
pub fn digest(password: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hasher.update(salt.as_bytes());
    hex::encode(hasher.finalize())
}

/// Checks a submitted password against a stored secret field.
pub fn verify(secret: &str, password: &str, username: &str) -> bool {
    match Secret::classify(secret) {
        Secret::Hashed { salt, digest: expected } => {
            trace!("Verifying salted hash for user {}", username);
            digest(password, salt) == expected
        }
        Secret::Plain(stored) => stored == password,
    }
}

/// Generates a new `salt!hexdigest` secret for `password`.
pub fn generate(password: &str) -> String {
    let mut rng = rand::thread_rng();
    let salt: String = (0..SALT_LEN)
        .map(|_| SALT_ALPHABET[rng.gen_range(0..SALT_ALPHABET.len())] as char)
        .collect();
    format!("{}!{}", salt, digest(password, &salt))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plaintext_is_exact() {
        assert!(verify("banana", "banana", "pub"));
        assert!(!verify("banana", "Banana", "pub"));
        assert!(!verify("banana", "banana ", "pub"));
        assert!(!verify("banana", "", "pub"));
        assert!(verify("", "", "pub"));
    }

    #[test]
    fn test_generated_secret_verifies() {
        let secret = generate("s3cret");
        assert!(is_hashed(&secret));
        assert!(verify(&secret, "s3cret", "alice"));
        assert!(!verify(&secret, "s3cretx", "alice"));
        assert!(!verify(&secret, &secret, "alice"));
    }

    #[test]
    fn test_generated_format() {
        let secret = generate("pw");
        let (salt, hex) = secret.split_once('!').unwrap();
        assert_eq!(salt.len(), SALT_LEN);
        assert!(salt.chars().all(|c| c.is_ascii_alphabetic()));
        assert_eq!(hex.len(), DIGEST_HEX_LEN);
        assert_ne!(generate("pw"), generate("pw"));
    }

    #[test]
    fn test_known_digest() {
        // sha256("abc") with an empty salt
        assert_eq!(
            digest("abc", ""),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        let secret = format!("xyz!{}", digest("pass", "xyz"));
        assert!(verify(&secret, "pass", "bob"));
    }

    #[test]
    fn test_classification_is_by_shape() {
        assert_eq!(Secret::classify("hunter2"), Secret::Plain("hunter2"));
        assert_eq!(Secret::classify("wow!such"), Secret::Plain("wow!such"));

        let uppercase_hex = format!("abc!{}", "A".repeat(DIGEST_HEX_LEN));
        assert!(matches!(Secret::classify(&uppercase_hex), Secret::Plain(_)));

        let salt_with_digit = format!("ab1!{}", "a".repeat(DIGEST_HEX_LEN));
        assert!(matches!(Secret::classify(&salt_with_digit), Secret::Plain(_)));

        let hashed = format!("abc!{}", "0".repeat(DIGEST_HEX_LEN));
        assert_eq!(
            Secret::classify(&hashed),
            Secret::Hashed { salt: "abc", digest: &hashed[4..] }
        );
    }

    #[test]
    fn test_plaintext_with_bang_compares_literally() {
        assert!(verify("wow!such", "wow!such", "doge"));
        assert!(!verify("wow!such", "wow", "doge"));
    }
}

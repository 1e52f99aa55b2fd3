//! One-time login codes.
//!
//! Codes are six decimal digits. Only a salted SHA-256 of the code is stored;
//! the email is the salt so equal codes for different users hash differently.
use sha2::{Digest, Sha256};
use uuid::Uuid;

pub const CODE_LEN: usize = 6;

pub fn generate_code() -> String {
    let n = Uuid::new_v4().as_u128() % 1_000_000;
    format!("{:0width$}", n, width = CODE_LEN)
}

pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_ascii_lowercase()
}

pub fn hash_code(email: &str, code: &str) -> String {
    let digest = Sha256::digest(format!("{}:{}", normalize_email(email), code.trim()).as_bytes());
    format!("{:x}", digest)
}

pub fn is_well_formed(code: &str) -> bool {
    code.len() == CODE_LEN && code.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_six_digits() {
        for _ in 0..32 {
            let code = generate_code();
            assert!(is_well_formed(&code), "bad code {code}");
        }
    }

    #[test]
    fn hash_depends_on_email_and_ignores_case() {
        assert_eq!(
            hash_code("Ada@Example.com", "123456"),
            hash_code("ada@example.com ", "123456")
        );
        assert_ne!(
            hash_code("ada@example.com", "123456"),
            hash_code("bob@example.com", "123456")
        );
    }

    #[test]
    fn rejects_malformed_codes() {
        assert!(!is_well_formed("12345"));
        assert!(!is_well_formed("12a456"));
        assert!(is_well_formed("004213"));
    }
}

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

use super::StoreError;

const MAX_EMAIL_LEN: usize = 254;
const MAX_TOKEN_LEN: usize = 512;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is valid")
});

/// Returns the trimmed, lowercased address.
pub fn email(email: &str) -> Result<String, StoreError> {
    let email = email.trim();

    if email.is_empty() {
        return Err(StoreError::InvalidInput("email is required".to_string()));
    }
    if email.len() > MAX_EMAIL_LEN || !EMAIL_RE.is_match(email) {
        return Err(StoreError::InvalidInput("email is malformed".to_string()));
    }
    Ok(email.to_lowercase())
}

pub fn token(token: &str) -> Result<(), StoreError> {
    if token.is_empty() {
        return Err(StoreError::InvalidInput("token is required".to_string()));
    }
    if token.len() > MAX_TOKEN_LEN {
        return Err(StoreError::InvalidInput(format!(
            "token exceeds {MAX_TOKEN_LEN} bytes"
        )));
    }
    if token.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(StoreError::InvalidInput(
            "token contains whitespace or control characters".to_string(),
        ));
    }
    Ok(())
}

pub fn ttl(ttl: Duration) -> Result<chrono::Duration, StoreError> {
    chrono::Duration::from_std(ttl)
        .map_err(|_| StoreError::InvalidInput("ttl is out of range".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_ordinary_addresses() {
        assert_eq!(email("a@x.com").unwrap(), "a@x.com");
        assert_eq!(email(" first.last+tag@school.edu\n").unwrap(), "first.last+tag@school.edu");
    }

    #[test]
    fn addresses_are_lowercased() {
        assert_eq!(email("Student@Test.COM").unwrap(), "student@test.com");
    }

    #[test]
    fn rejects_malformed_addresses() {
        for bad in ["", "   ", "a", "a@", "@x.com", "a@x", "a b@x.com", "a@@x.com"] {
            assert!(email(bad).is_err(), "{bad:?} should be rejected");
        }
        let long = format!("{}@x.com", "a".repeat(MAX_EMAIL_LEN));
        assert!(email(&long).is_err());
    }

    #[test]
    fn token_bounds() {
        assert!(token("abc123").is_ok());
        assert!(token(&"a".repeat(MAX_TOKEN_LEN)).is_ok());
        assert!(token("").is_err());
        assert!(token(&"a".repeat(MAX_TOKEN_LEN + 1)).is_err());
        assert!(token("abc def").is_err());
        assert!(token("abc\0").is_err());
    }

    #[test]
    fn ttl_conversion() {
        assert_eq!(ttl(Duration::from_secs(600)).unwrap(), chrono::Duration::seconds(600));
        assert_eq!(ttl(Duration::ZERO).unwrap(), chrono::Duration::zero());
        assert!(ttl(Duration::from_secs(u64::MAX)).is_err());
    }
}

use sha2::{Digest, Sha256};

use crate::config::LoggingConfig;

/// Creates a truncated, salted hash of an identifier for safe logging.
///
/// # Arguments
/// * `id` - The identifier to hash (customer or provider id).
/// * `salt` - `LOG_HASH_SALT` from configuration.
pub fn log_safe_id(id: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(id.as_bytes());
    hex::encode(&hasher.finalize()[..4])
}

/// Short, unsalted fingerprint of a device token.
///
/// Stable across processes so a pruned token can be matched to the log line
/// that registered it.
pub fn token_fingerprint(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    hex::encode(&digest[..6])
}

/// Renders user identifiers for log fields according to `LoggingConfig`
#[derive(Clone, Debug)]
pub struct LogIds {
    enable_user_identifiers: bool,
    salt: String,
}

impl LogIds {
    pub fn new(config: &LoggingConfig) -> Self {
        Self {
            enable_user_identifiers: config.enable_user_identifiers,
            salt: config.hash_salt.clone(),
        }
    }

    pub fn user(&self, id: &str) -> String {
        if self.enable_user_identifiers {
            id.to_string()
        } else {
            log_safe_id(id, &self.salt)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_safe_id_is_salted_and_short() {
        let a = log_safe_id("cust1", "salt-a");
        let b = log_safe_id("cust1", "salt-b");
        assert_eq!(a.len(), 8);
        assert_ne!(a, b);
        assert_eq!(a, log_safe_id("cust1", "salt-a"));
    }

    #[test]
    fn token_fingerprint_does_not_leak_token() {
        let fp = token_fingerprint("fcm-token-abcdef");
        assert_eq!(fp.len(), 12);
        assert!(!fp.contains("fcm"));
    }

    #[test]
    fn log_ids_respect_config() {
        let mut config = LoggingConfig::default();
        assert_ne!(LogIds::new(&config).user("prov1"), "prov1");

        config.enable_user_identifiers = true;
        assert_eq!(LogIds::new(&config).user("prov1"), "prov1");
    }
}

// ============================================================================
// Push Delivery Configuration
// ============================================================================

use anyhow::{Context, Result};

const DEFAULT_FCM_ENDPOINT: &str = "https://fcm.googleapis.com";

/// Which transport carries push notifications
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PushProvider {
    Fcm,
    Apns,
    Disabled,
}

impl std::str::FromStr for PushProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "fcm" | "firebase" => Ok(Self::Fcm),
            "apns" => Ok(Self::Apns),
            "disabled" | "none" | "off" => Ok(Self::Disabled),
            _ => anyhow::bail!(
                "Invalid push provider: {}. Must be 'fcm', 'apns' or 'disabled'",
                s
            ),
        }
    }
}

/// Firebase Cloud Messaging (HTTP v1) configuration
#[derive(Clone)]
pub struct FcmConfig {
    /// Service account JSON as downloaded from the Firebase console
    pub service_account_json: String,
    /// Overrides the project id found in the service account
    pub project_id: Option<String>,
    /// Base URL of the FCM API
    pub endpoint: String,
}

// The service account carries a private key
impl std::fmt::Debug for FcmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FcmConfig")
            .field("project_id", &self.project_id)
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

/// APNs environment
#[derive(Clone, Debug, PartialEq)]
pub enum ApnsEnvironment {
    Production,
    Development,
}

impl std::str::FromStr for ApnsEnvironment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "production" | "prod" => Ok(Self::Production),
            "development" | "dev" => Ok(Self::Development),
            _ => anyhow::bail!(
                "Invalid APNs environment: {}. Must be 'production' or 'development'",
                s
            ),
        }
    }
}

/// APNs (Apple Push Notification service) token-auth configuration
#[derive(Clone, Debug)]
pub struct ApnsConfig {
    pub environment: ApnsEnvironment,
    /// Path to .p8 authentication key file
    pub key_path: String,
    /// APNs Key ID (10 characters)
    pub key_id: String,
    pub team_id: String,
    /// APNs topic (the app bundle id)
    pub topic: String,
}

#[derive(Clone, Debug)]
pub struct PushConfig {
    pub provider: PushProvider,
    pub fcm: Option<FcmConfig>,
    pub apns: Option<ApnsConfig>,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            provider: PushProvider::Disabled,
            fcm: None,
            apns: None,
        }
    }
}

impl PushConfig {
    pub(crate) fn from_env() -> Result<Self> {
        let provider: PushProvider = std::env::var("PUSH_PROVIDER")
            .unwrap_or_else(|_| "disabled".to_string())
            .parse()?;

        let fcm = match provider {
            PushProvider::Fcm => Some(FcmConfig::from_env()?),
            _ => None,
        };
        let apns = match provider {
            PushProvider::Apns => Some(ApnsConfig::from_env()?),
            _ => None,
        };

        Ok(Self {
            provider,
            fcm,
            apns,
        })
    }
}

impl FcmConfig {
    fn from_env() -> Result<Self> {
        // FIREBASE_SERVICE_ACCOUNT is accepted for existing deployments
        let inline = std::env::var("FCM_SERVICE_ACCOUNT")
            .or_else(|_| std::env::var("FIREBASE_SERVICE_ACCOUNT"))
            .ok();

        let service_account_json = match inline {
            Some(json) => json,
            None => {
                let path = std::env::var("FCM_SERVICE_ACCOUNT_PATH").map_err(|_| {
                    anyhow::anyhow!(
                        "PUSH_PROVIDER=fcm requires FCM_SERVICE_ACCOUNT or FCM_SERVICE_ACCOUNT_PATH"
                    )
                })?;
                std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read FCM service account: {}", path))?
            }
        };

        Ok(Self {
            service_account_json,
            project_id: std::env::var("FCM_PROJECT_ID").ok(),
            endpoint: std::env::var("FCM_ENDPOINT")
                .unwrap_or_else(|_| DEFAULT_FCM_ENDPOINT.to_string()),
        })
    }
}

impl ApnsConfig {
    fn from_env() -> Result<Self> {
        let required = |name: &str| {
            std::env::var(name)
                .map_err(|_| anyhow::anyhow!("PUSH_PROVIDER=apns requires {}", name))
        };

        Ok(Self {
            environment: std::env::var("APNS_ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string())
                .parse()?,
            key_path: required("APNS_KEY_PATH")?,
            key_id: required("APNS_KEY_ID")?,
            team_id: required("APNS_TEAM_ID")?,
            topic: required("APNS_TOPIC")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_provider_parses() {
        assert_eq!("FCM".parse::<PushProvider>().unwrap(), PushProvider::Fcm);
        assert_eq!("apns".parse::<PushProvider>().unwrap(), PushProvider::Apns);
        assert_eq!("off".parse::<PushProvider>().unwrap(), PushProvider::Disabled);
        assert!("pigeon".parse::<PushProvider>().is_err());
    }

    #[test]
    fn fcm_debug_hides_service_account() {
        let config = FcmConfig {
            service_account_json: "{\"private_key\":\"secret\"}".to_string(),
            project_id: Some("demo".to_string()),
            endpoint: DEFAULT_FCM_ENDPOINT.to_string(),
        };
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("demo"));
    }
}

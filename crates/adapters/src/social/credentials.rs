//! Credential sources for platform adapters
//!
//! Secrets are resolved on every call so rotated tokens are picked up
//! without rebuilding the adapter.

use secrecy::{ExposeSecret, SecretString};

/// Where a single secret comes from
#[derive(Clone)]
pub enum CredentialSource {
    /// Named environment variable, read on each resolve
    Env(String),
    /// Fixed value, mostly for tests
    Static(SecretString),
    Missing,
}

impl CredentialSource {
    pub fn env(var: impl Into<String>) -> Self {
        let var = var.into();
        if var.trim().is_empty() {
            CredentialSource::Missing
        } else {
            CredentialSource::Env(var)
        }
    }

    pub fn value(secret: impl Into<String>) -> Self {
        CredentialSource::Static(SecretString::from(secret.into()))
    }

    /// Current value, `None` when unset or blank
    pub fn resolve(&self) -> Option<SecretString> {
        let secret = match self {
            CredentialSource::Env(var) => SecretString::from(std::env::var(var).ok()?),
            CredentialSource::Static(secret) => secret.clone(),
            CredentialSource::Missing => return None,
        };
        if secret.expose_secret().trim().is_empty() {
            None
        } else {
            Some(secret)
        }
    }

    /// Human-readable origin, never the value
    pub fn describe(&self) -> String {
        match self {
            CredentialSource::Env(var) => format!("${}", var),
            CredentialSource::Static(_) => "<static>".to_string(),
            CredentialSource::Missing => "<unset>".to_string(),
        }
    }
}

impl std::fmt::Debug for CredentialSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.describe())
    }
}

/// OAuth client credentials plus the access token used to post
#[derive(Debug, Clone)]
pub struct PlatformCredentials {
    pub client_id: CredentialSource,
    pub client_secret: CredentialSource,
    pub access_token: CredentialSource,
}

impl PlatformCredentials {
    pub fn from_env(
        client_id_env: impl Into<String>,
        client_secret_env: impl Into<String>,
        access_token_env: impl Into<String>,
    ) -> Self {
        Self {
            client_id: CredentialSource::env(client_id_env),
            client_secret: CredentialSource::env(client_secret_env),
            access_token: CredentialSource::env(access_token_env),
        }
    }

    pub fn missing() -> Self {
        Self {
            client_id: CredentialSource::Missing,
            client_secret: CredentialSource::Missing,
            access_token: CredentialSource::Missing,
        }
    }

    /// Client id and secret both resolve
    pub fn has_client(&self) -> bool {
        self.client_id.resolve().is_some() && self.client_secret.resolve().is_some()
    }

    pub fn access_token(&self) -> Option<SecretString> {
        self.access_token.resolve()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_credentials_resolve() {
        let creds = PlatformCredentials {
            client_id: CredentialSource::value("id"),
            client_secret: CredentialSource::value("secret"),
            access_token: CredentialSource::value("token"),
        };

        assert!(creds.has_client());
        assert_eq!(creds.access_token().unwrap().expose_secret(), "token");
    }

    #[test]
    fn test_blank_and_unset_values_do_not_resolve() {
        assert!(CredentialSource::value("   ").resolve().is_none());
        assert!(CredentialSource::env("").resolve().is_none());
        assert!(
            CredentialSource::env("SOCIAL_PUBLISH_TEST_UNSET_VARIABLE_7F3A")
                .resolve()
                .is_none()
        );
        assert!(!PlatformCredentials::missing().has_client());
    }

    #[test]
    fn test_debug_does_not_leak_secret() {
        let source = CredentialSource::value("super-secret");
        assert_eq!(format!("{:?}", source), "<static>");
        assert_eq!(CredentialSource::env("TIKTOK_TOKEN").describe(), "$TIKTOK_TOKEN");
    }
}

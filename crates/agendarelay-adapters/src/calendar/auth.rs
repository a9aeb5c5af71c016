//! Google service-account authentication.
//!
//! A service account signs a short-lived JWT with its private key and trades
//! it at the OAuth token endpoint for a bearer access token (the JWT-bearer
//! grant, RFC 7523).

use std::fmt;

use agendarelay_core::{Config, ConfigError};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};

/// Read-only calendar scope.
pub const CALENDAR_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/calendar.readonly";

/// Google's OAuth 2.0 token endpoint.
pub const GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Lifetime requested for each signed assertion. Google caps this at one hour.
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Tokens are treated as expired this long before their actual expiry.
const EXPIRY_LEEWAY_SECS: i64 = 60;

/// Service-account credentials as supplied by the environment.
#[derive(Clone)]
pub struct ServiceAccountCredentials {
    /// The service account's email (`...@....iam.gserviceaccount.com`).
    pub client_email: String,
    /// PEM-encoded private key.
    pub private_key: String,
}

impl ServiceAccountCredentials {
    /// Environment variable holding the account email.
    pub const EMAIL_VAR: &'static str = "GOOGLE_SERVICE_ACCOUNT_EMAIL";
    /// Environment variable holding the private key.
    pub const KEY_VAR: &'static str = "GOOGLE_PRIVATE_KEY";

    /// Creates credentials, unescaping literal `\n` sequences in the key.
    ///
    /// Keys stored in environment variables usually have their newlines
    /// escaped, which PEM parsing does not accept.
    pub fn new(client_email: impl Into<String>, private_key: impl AsRef<str>) -> Self {
        Self {
            client_email: client_email.into(),
            private_key: private_key.as_ref().replace("\\n", "\n"),
        }
    }

    /// Resolves both values from configuration.
    pub fn from_config(config: &Config<'_>) -> Result<Self, ConfigError> {
        let client_email = config.string(Self::EMAIL_VAR)?;
        let private_key = config.string(Self::KEY_VAR)?;
        Ok(Self::new(client_email, private_key))
    }
}

impl fmt::Debug for ServiceAccountCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountCredentials")
            .field("client_email", &self.client_email)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct AssertionClaims {
    iss: String,
    scope: String,
    aud: String,
    iat: i64,
    exp: i64,
}

/// A bearer token with its expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    /// Returns `true` if the token is expired (or about to be) at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(EXPIRY_LEEWAY_SECS) >= self.expires_at
    }
}

/// Token endpoint response.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    #[serde(default = "default_expires_in")]
    pub expires_in: i64,
}

fn default_expires_in() -> i64 {
    ASSERTION_LIFETIME_SECS
}

impl TokenResponse {
    pub(crate) fn into_token(self, now: DateTime<Utc>) -> AccessToken {
        AccessToken {
            token: self.access_token,
            expires_at: now + Duration::seconds(self.expires_in),
        }
    }
}

/// Signs assertions for one service account.
#[derive(Clone)]
pub struct ServiceAccountAuth {
    client_email: String,
    key: EncodingKey,
    scopes: Vec<String>,
    token_uri: String,
}

impl ServiceAccountAuth {
    /// Parses the private key.
    ///
    /// # Errors
    ///
    /// Fails if the key is not a valid RSA PEM (PKCS#1 or PKCS#8).
    pub fn new(
        credentials: &ServiceAccountCredentials,
        scopes: &[&str],
    ) -> Result<Self, jsonwebtoken::errors::Error> {
        let key = EncodingKey::from_rsa_pem(credentials.private_key.as_bytes())?;
        Ok(Self {
            client_email: credentials.client_email.clone(),
            key,
            scopes: scopes.iter().map(|s| s.to_string()).collect(),
            token_uri: GOOGLE_TOKEN_URI.to_string(),
        })
    }

    /// Overrides the token endpoint.
    pub fn with_token_uri(mut self, token_uri: impl Into<String>) -> Self {
        self.token_uri = token_uri.into();
        self
    }

    /// Returns the token endpoint.
    pub fn token_uri(&self) -> &str {
        &self.token_uri
    }

    /// Signs an RS256 assertion valid from `now`.
    pub fn assertion(&self, now: DateTime<Utc>) -> Result<String, jsonwebtoken::errors::Error> {
        let claims = AssertionClaims {
            iss: self.client_email.clone(),
            scope: self.scopes.join(" "),
            aud: self.token_uri.clone(),
            iat: now.timestamp(),
            exp: now.timestamp() + ASSERTION_LIFETIME_SECS,
        };
        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &self.key)
    }

    /// Form body for the token request.
    pub(crate) fn grant_form(assertion: &str) -> [(&'static str, &str); 2] {
        [("grant_type", JWT_BEARER_GRANT), ("assertion", assertion)]
    }
}

impl fmt::Debug for ServiceAccountAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountAuth")
            .field("client_email", &self.client_email)
            .field("scopes", &self.scopes)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use agendarelay_core::MapConfig;
    use chrono::TimeZone;
    use jsonwebtoken::{DecodingKey, Validation};

    use super::*;

    pub(crate) const TEST_KEY: &str = include_str!("../../testdata/service_account_key.pem");

    pub(crate) fn credentials() -> ServiceAccountCredentials {
        ServiceAccountCredentials::new("notifier@demo.iam.gserviceaccount.com", TEST_KEY)
    }

    #[test]
    fn new_unescapes_newlines() {
        let creds = ServiceAccountCredentials::new("a@b", "-----BEGIN-----\\nabc\\n-----END-----");
        assert_eq!(creds.private_key, "-----BEGIN-----\nabc\n-----END-----");
    }

    #[test]
    fn from_config_requires_both_values() {
        let source = MapConfig::new().with(ServiceAccountCredentials::EMAIL_VAR, "a@b");
        let err = ServiceAccountCredentials::from_config(&Config::new(&source)).unwrap_err();
        assert_eq!(err, ConfigError::missing("GOOGLE_PRIVATE_KEY"));
    }

    #[test]
    fn debug_redacts_key() {
        let debug = format!("{:?}", credentials());
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("PRIVATE KEY"));
    }

    #[test]
    fn escaped_key_from_env_parses() {
        let escaped = TEST_KEY.replace('\n', "\\n");
        let creds = ServiceAccountCredentials::new("a@b", escaped);
        assert!(ServiceAccountAuth::new(&creds, &[CALENDAR_READONLY_SCOPE]).is_ok());
    }

    #[test]
    fn malformed_key_is_rejected() {
        let creds = ServiceAccountCredentials::new("a@b", "not a pem key");
        assert!(ServiceAccountAuth::new(&creds, &[CALENDAR_READONLY_SCOPE]).is_err());
    }

    #[test]
    fn assertion_carries_grant_claims() {
        let auth = ServiceAccountAuth::new(&credentials(), &[CALENDAR_READONLY_SCOPE]).unwrap();
        let now = Utc.with_ymd_and_hms(2025, 2, 5, 10, 0, 0).unwrap();
        let jwt = auth.assertion(now).unwrap();

        let header = jsonwebtoken::decode_header(&jwt).unwrap();
        assert_eq!(header.alg, Algorithm::RS256);

        // Only the payload is inspected here; signature checks would need
        // the public half of the fixture key.
        let mut validation = Validation::new(Algorithm::RS256);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.set_audience(&[GOOGLE_TOKEN_URI]);
        let data = jsonwebtoken::decode::<AssertionClaims>(
            &jwt,
            &DecodingKey::from_secret(&[]),
            &validation,
        )
        .unwrap();

        assert_eq!(data.claims.iss, "notifier@demo.iam.gserviceaccount.com");
        assert_eq!(data.claims.scope, CALENDAR_READONLY_SCOPE);
        assert_eq!(data.claims.aud, GOOGLE_TOKEN_URI);
        assert_eq!(data.claims.exp - data.claims.iat, 3600);
    }

    #[test]
    fn token_expiry_uses_leeway() {
        let now = Utc.with_ymd_and_hms(2025, 2, 5, 10, 0, 0).unwrap();
        let token = TokenResponse {
            access_token: "ya29.token".into(),
            expires_in: 3599,
        }
        .into_token(now);

        assert!(!token.is_expired(now));
        assert!(token.is_expired(now + Duration::seconds(3540)));
    }
}

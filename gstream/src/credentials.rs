//! Bearer credentials for the answer transport.
//!
//! ```rust
//! use gstream::{SecretString, TransportAuth};
//!
//! let auth = TransportAuth::api_key("sk-test");
//! assert_eq!(auth.bearer(), "sk-test");
//! assert_eq!(format!("{:?}", SecretString::new("sk-test")), "[REDACTED]");
//! ```

use gcommon::BoxFuture;

use crate::StreamError;

#[derive(Clone, PartialEq, Eq)]
pub struct SecretString {
    value: String,
}

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    pub fn expose(&self) -> &str {
        self.value.as_str()
    }

    pub fn is_empty(&self) -> bool {
        self.value.trim().is_empty()
    }
}

impl std::fmt::Debug for SecretString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl Drop for SecretString {
    fn drop(&mut self) {
        unsafe {
            self.value.as_mut_vec().fill(0);
        }
    }
}

/// Credential attached to a request as `Authorization: Bearer ...`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportAuth {
    /// Platform API key.
    ApiKey(SecretString),
    /// Session access token issued for the conversation endpoint.
    AccessToken(SecretString),
}

impl TransportAuth {
    pub fn api_key(value: impl Into<String>) -> Self {
        Self::ApiKey(SecretString::new(value))
    }

    pub fn access_token(value: impl Into<String>) -> Self {
        Self::AccessToken(SecretString::new(value))
    }

    pub fn bearer(&self) -> &str {
        match self {
            Self::ApiKey(secret) | Self::AccessToken(secret) => secret.expose(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::ApiKey(secret) | Self::AccessToken(secret) => secret.is_empty(),
        }
    }
}

/// Supplies the bearer credential for each request.
///
/// `invalidate` is called after the provider rejects the credential so the
/// next `resolve` can fetch a fresh one.
pub trait CredentialSource: Send + Sync {
    fn resolve<'a>(&'a self) -> BoxFuture<'a, Result<TransportAuth, StreamError>>;

    fn invalidate<'a>(&'a self) -> BoxFuture<'a, ()> {
        Box::pin(async {})
    }
}

/// Fixed credential; invalidation is a no-op.
#[derive(Debug, Clone)]
pub struct StaticCredential {
    auth: TransportAuth,
}

impl StaticCredential {
    pub fn new(auth: TransportAuth) -> Self {
        Self { auth }
    }

    pub fn api_key(value: impl Into<String>) -> Self {
        Self::new(TransportAuth::api_key(value))
    }
}

impl CredentialSource for StaticCredential {
    fn resolve<'a>(&'a self) -> BoxFuture<'a, Result<TransportAuth, StreamError>> {
        Box::pin(async move {
            if self.auth.is_empty() {
                return Err(StreamError::unauthorized("credential must not be empty"));
            }
            Ok(self.auth.clone())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{CredentialSource, SecretString, StaticCredential, TransportAuth};
    use crate::StreamErrorKind;

    #[test]
    fn secrets_are_redacted_in_debug_output() {
        let auth = TransportAuth::access_token("token-123");
        let rendered = format!("{auth:?}");
        assert!(!rendered.contains("token-123"));
        assert!(rendered.contains("[REDACTED]"));
        assert!(SecretString::new("   ").is_empty());
    }

    #[tokio::test]
    async fn static_credential_resolves_and_rejects_empty_values() {
        let source = StaticCredential::api_key("sk-live");
        let auth = source.resolve().await.expect("credential should resolve");
        assert_eq!(auth.bearer(), "sk-live");

        source.invalidate().await;
        assert!(source.resolve().await.is_ok());

        let empty = StaticCredential::api_key("");
        let error = empty.resolve().await.expect_err("empty credential should fail");
        assert_eq!(error.kind, StreamErrorKind::Unauthorized);
    }
}

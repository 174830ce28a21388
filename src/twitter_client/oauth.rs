//! OAuth 1.0a user-context signing (HMAC-SHA1).

use crate::credentials::Credentials;
use crate::error::ApiError;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use hmac::{Hmac, Mac};
use itertools::Itertools;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use rand::RngCore;
use sha1::Sha1;
use std::time::{SystemTime, UNIX_EPOCH};

// RFC 3986 unreserved characters pass through; everything else is encoded.
const OAUTH_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

#[derive(Clone)]
pub struct OAuthSigner {
    credentials: Credentials,
}

impl OAuthSigner {
    pub fn new(credentials: &Credentials) -> Self {
        Self {
            credentials: credentials.clone(),
        }
    }

    /// Builds the `Authorization` header for a request. `url` must not carry a query string;
    /// query parameters go in `params`.
    pub fn sign(&self, method: &str, url: &str, params: &[(String, String)]) -> Result<String, ApiError> {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| ApiError::OAuth(format!("clock before epoch: {e}")))?
            .as_secs()
            .to_string();
        self.sign_with(method, url, params, &generate_nonce(), &timestamp)
    }

    fn sign_with(
        &self,
        method: &str,
        url: &str,
        params: &[(String, String)],
        nonce: &str,
        timestamp: &str,
    ) -> Result<String, ApiError> {
        let mut oauth_params = vec![
            ("oauth_consumer_key", self.credentials.consumer_key().to_string()),
            ("oauth_nonce", nonce.to_string()),
            ("oauth_signature_method", String::from("HMAC-SHA1")),
            ("oauth_timestamp", timestamp.to_string()),
            ("oauth_token", self.credentials.access_token().to_string()),
            ("oauth_version", String::from("1.0")),
        ];

        let param_string = oauth_params
            .iter()
            .map(|(k, v)| (encode(k), encode(v)))
            .chain(params.iter().map(|(k, v)| (encode(k), encode(v))))
            .sorted()
            .map(|(k, v)| format!("{k}={v}"))
            .join("&");

        let base_string = format!(
            "{}&{}&{}",
            method.to_uppercase(),
            encode(url),
            encode(&param_string)
        );
        let signing_key = format!(
            "{}&{}",
            encode(self.credentials.consumer_secret()),
            encode(self.credentials.access_token_secret())
        );

        let mut mac = Hmac::<Sha1>::new_from_slice(signing_key.as_bytes())
            .map_err(|e| ApiError::OAuth(e.to_string()))?;
        mac.update(base_string.as_bytes());
        let signature = BASE64.encode(mac.finalize().into_bytes());
        oauth_params.push(("oauth_signature", signature));

        let header = oauth_params
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", encode(k), encode(v)))
            .join(", ");
        Ok(format!("OAuth {header}"))
    }
}

fn encode(s: &str) -> String {
    utf8_percent_encode(s, OAUTH_ENCODE_SET).to_string()
}

fn generate_nonce() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

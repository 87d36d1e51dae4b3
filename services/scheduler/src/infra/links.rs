//! Signed unsubscribe links.
//!
//! The token is `base64url(HMAC-SHA256(secret, normalized address))`, so only the
//! service can mint a link that opts an address out.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use reqwest::Url;
use sha2::Sha256;

use nurture_domain::recipient::Recipient;

use crate::config::ConfigError;

type HmacSha256 = Hmac<Sha256>;

#[derive(Clone)]
pub struct UnsubscribeLinks {
    endpoint: Url,
    secret: Vec<u8>,
}

impl UnsubscribeLinks {
    pub fn new(public_base_url: &str, secret: &str) -> Result<Self, ConfigError> {
        let raw = format!("{}/unsubscribe", public_base_url.trim_end_matches('/'));
        let endpoint = Url::parse(&raw).map_err(|e| ConfigError::Invalid {
            var: "PUBLIC_BASE_URL",
            reason: e.to_string(),
        })?;
        Ok(Self {
            endpoint,
            secret: secret.as_bytes().to_vec(),
        })
    }

    fn mac(&self, recipient: &Recipient) -> Option<HmacSha256> {
        // HMAC accepts keys of any length.
        let mut mac = HmacSha256::new_from_slice(&self.secret).ok()?;
        mac.update(recipient.as_str().as_bytes());
        Some(mac)
    }

    pub fn token_for(&self, recipient: &Recipient) -> String {
        self.mac(recipient)
            .map(|mac| URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes()))
            .unwrap_or_default()
    }

    /// Constant-time check of a presented token.
    pub fn verify(&self, recipient: &Recipient, token: &str) -> bool {
        let Ok(presented) = URL_SAFE_NO_PAD.decode(token.trim()) else {
            return false;
        };
        self.mac(recipient)
            .is_some_and(|mac| mac.verify_slice(&presented).is_ok())
    }

    pub fn url_for(&self, recipient: &Recipient) -> String {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("email", recipient.as_str())
            .append_pair("token", &self.token_for(recipient));
        url.to_string()
    }
}

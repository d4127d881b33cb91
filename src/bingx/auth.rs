use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::{SystemTime, UNIX_EPOCH};

type HmacSha256 = Hmac<Sha256>;

pub struct BingxAuth {
    api_key: String,
    api_secret: String,
}

impl BingxAuth {
    pub fn new(api_key: String, api_secret: String) -> Self {
        Self { api_key, api_secret }
    }

    pub fn get_api_key(&self) -> &str {
        &self.api_key
    }

    /// Generate HMAC signature for REST API requests. BingX signs the
    /// url-encoded query string itself, sorted by parameter name.
    pub fn generate_signature(&self, query_string: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(self.api_secret.as_bytes())
            .expect("HMAC can take key of any size");

        mac.update(query_string.as_bytes());

        hex::encode(mac.finalize().into_bytes())
    }

    /// Build the sorted query string from parameters and append the
    /// signature, ready to be sent as a URL query or a form body.
    pub fn signed_query(&self, mut params: Vec<(&str, String)>) -> String {
        params.sort_by(|a, b| a.0.cmp(b.0));
        let query = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");
        let signature = self.generate_signature(&query);
        format!("{}&signature={}", query, signature)
    }

    /// Current timestamp in milliseconds.
    pub fn get_timestamp() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("Time went backwards")
            .as_millis() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_generation() {
        let auth = BingxAuth::new("test_key".to_string(), "test_secret".to_string());
        let params = "symbol=BTC-USDT&timestamp=1234567890000";

        let signature = auth.generate_signature(params);
        assert!(!signature.is_empty());
        assert_eq!(signature.len(), 64); // SHA256 produces 64 hex characters
    }

    #[test]
    fn test_signature_is_deterministic() {
        let auth = BingxAuth::new("test_key".to_string(), "test_secret".to_string());
        let a = auth.generate_signature("timestamp=1");
        let b = auth.generate_signature("timestamp=1");
        assert_eq!(a, b);
        let c = auth.generate_signature("timestamp=2");
        assert_ne!(a, c);
    }

    #[test]
    fn test_signed_query_sorts_params() {
        let auth = BingxAuth::new("k".to_string(), "s".to_string());
        let signed = auth.signed_query(vec![
            ("timestamp", "1".to_string()),
            ("symbol", "BTC-USDT".to_string()),
        ]);
        assert!(signed.starts_with("symbol=BTC-USDT&timestamp=1&signature="));
    }
}

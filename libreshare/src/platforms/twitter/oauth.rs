//! OAuth 1.0a request signing (HMAC-SHA1)
//!
//! Both the stream and the request API authenticate every request with a
//! user-context `Authorization: OAuth ...` header. The signature covers the
//! method, the base URL and every query/form parameter together with the
//! `oauth_*` protocol parameters.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use rand::distributions::Alphanumeric;
use rand::Rng;
use sha1::Sha1;

use crate::config::Credentials;
use crate::error::{PlatformError, Result};

type HmacSha1 = Hmac<Sha1>;

const SIGNATURE_METHOD: &str = "HMAC-SHA1";
const OAUTH_VERSION: &str = "1.0";

/// RFC 3986 percent-encoding: everything except `A-Z a-z 0-9 - . _ ~`
pub fn percent_encode(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// Build the `Authorization` header value for a request
///
/// `params` are the query or form-encoded body parameters of the request,
/// unencoded.
pub fn authorization_header(
    credentials: &Credentials,
    method: &str,
    url: &str,
    params: &[(&str, &str)],
) -> Result<String> {
    let nonce = generate_nonce();
    let timestamp = chrono::Utc::now().timestamp().to_string();
    signed_header(credentials, method, url, params, &nonce, &timestamp)
}

fn generate_nonce() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

fn protocol_params<'a>(
    credentials: &'a Credentials,
    nonce: &'a str,
    timestamp: &'a str,
) -> Vec<(&'a str, &'a str)> {
    vec![
        ("oauth_consumer_key", credentials.consumer_key()),
        ("oauth_nonce", nonce),
        ("oauth_signature_method", SIGNATURE_METHOD),
        ("oauth_timestamp", timestamp),
        ("oauth_token", credentials.access_token()),
        ("oauth_version", OAUTH_VERSION),
    ]
}

/// Signature base string: `METHOD&url&normalized-params`, each part encoded
pub(crate) fn signature_base_string(method: &str, url: &str, params: &[(&str, &str)]) -> String {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| (percent_encode(k), percent_encode(v)))
        .collect();
    encoded.sort();

    let normalized = encoded
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    format!(
        "{}&{}&{}",
        method.to_uppercase(),
        percent_encode(url),
        percent_encode(&normalized)
    )
}

pub(crate) fn sign(credentials: &Credentials, base_string: &str) -> Result<String> {
    let key = format!(
        "{}&{}",
        percent_encode(credentials.consumer_secret()),
        percent_encode(credentials.access_token_secret())
    );

    let mut mac = HmacSha1::new_from_slice(key.as_bytes()).map_err(|e| {
        PlatformError::Authentication(format!("Failed to initialise OAuth signer: {}", e))
    })?;
    mac.update(base_string.as_bytes());

    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

fn signed_header(
    credentials: &Credentials,
    method: &str,
    url: &str,
    params: &[(&str, &str)],
    nonce: &str,
    timestamp: &str,
) -> Result<String> {
    let oauth = protocol_params(credentials, nonce, timestamp);

    let mut all = oauth.clone();
    all.extend_from_slice(params);
    let signature = sign(credentials, &signature_base_string(method, url, &all))?;

    let mut fields: Vec<String> = oauth
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", percent_encode(k), percent_encode(v)))
        .collect();
    fields.push(format!("oauth_signature=\"{}\"", percent_encode(&signature)));
    fields.sort();

    Ok(format!("OAuth {}", fields.join(", ")))
}

#[cfg(test)]
mod tests {
    use super::*;

    // Worked example from Twitter's "Creating a signature" guide
    fn example_credentials() -> Credentials {
        Credentials::new(
            "xvz1evFS4wEEPTGEFPHBog",
            "kAcSOqF21Fu85e7zjz7ZN2U4ZRhfV3WpwPAoE3Z7kBw",
            "370773112-GmHxMAgYyLbNEtIKZeRNFsMKPR9EyMZeS9weJAEb",
            "LswwdoUaIvS8ltyTt5jkRh4J50vUPVVHtR2YPi5kE",
        )
    }

    const EXAMPLE_URL: &str = "https://api.twitter.com/1.1/statuses/update.json";
    const EXAMPLE_NONCE: &str = "kYjzVBB8Y0ZFabxSWbWovY3uYSQ2pTgmZeNu2VS4cg";
    const EXAMPLE_TIMESTAMP: &str = "1318622958";

    fn example_params() -> Vec<(&'static str, &'static str)> {
        vec![
            ("status", "Hello Ladies + Gentlemen, a signed OAuth request!"),
            ("include_entities", "true"),
        ]
    }

    #[test]
    fn test_percent_encode_reserved_characters() {
        assert_eq!(percent_encode("Ladies + Gentlemen"), "Ladies%20%2B%20Gentlemen");
        assert_eq!(percent_encode("An encoded string!"), "An%20encoded%20string%21");
        assert_eq!(percent_encode("Dogs, Cats & Mice"), "Dogs%2C%20Cats%20%26%20Mice");
        assert_eq!(percent_encode("-._~"), "-._~");
        assert_eq!(percent_encode("#ruby"), "%23ruby");
    }

    #[test]
    fn test_signature_base_string_matches_reference() {
        let credentials = example_credentials();
        let mut params = protocol_params(&credentials, EXAMPLE_NONCE, EXAMPLE_TIMESTAMP);
        params.extend(example_params());

        let base = signature_base_string("post", EXAMPLE_URL, &params);
        assert_eq!(
            base,
            "POST&https%3A%2F%2Fapi.twitter.com%2F1.1%2Fstatuses%2Fupdate.json&include_entities%3Dtrue%26oauth_consumer_key%3Dxvz1evFS4wEEPTGEFPHBog%26oauth_nonce%3DkYjzVBB8Y0ZFabxSWbWovY3uYSQ2pTgmZeNu2VS4cg%26oauth_signature_method%3DHMAC-SHA1%26oauth_timestamp%3D1318622958%26oauth_token%3D370773112-GmHxMAgYyLbNEtIKZeRNFsMKPR9EyMZeS9weJAEb%26oauth_version%3D1.0%26status%3DHello%2520Ladies%2520%252B%2520Gentlemen%252C%2520a%2520signed%2520OAuth%2520request%2521"
        );
    }

    #[test]
    fn test_signature_matches_reference() {
        let credentials = example_credentials();
        let mut params = protocol_params(&credentials, EXAMPLE_NONCE, EXAMPLE_TIMESTAMP);
        params.extend(example_params());

        let base = signature_base_string("POST", EXAMPLE_URL, &params);
        assert_eq!(
            sign(&credentials, &base).unwrap(),
            "hCtSmYh+iHYCEqBWrE7C7hYmtUk="
        );
    }

    #[test]
    fn test_header_contains_encoded_signature() {
        let credentials = example_credentials();
        let header = signed_header(
            &credentials,
            "POST",
            EXAMPLE_URL,
            &example_params(),
            EXAMPLE_NONCE,
            EXAMPLE_TIMESTAMP,
        )
        .unwrap();

        assert!(header.starts_with("OAuth "));
        assert!(header.contains("oauth_signature=\"hCtSmYh%2BiHYCEqBWrE7C7hYmtUk%3D\""));
        assert!(header.contains("oauth_consumer_key=\"xvz1evFS4wEEPTGEFPHBog\""));
        assert!(header.contains("oauth_version=\"1.0\""));
        // Request parameters are signed but not sent in the header
        assert!(!header.contains("status="));
    }

    #[test]
    fn test_fresh_nonce_per_request() {
        let credentials = example_credentials();
        let first = authorization_header(&credentials, "GET", EXAMPLE_URL, &[]).unwrap();
        let second = authorization_header(&credentials, "GET", EXAMPLE_URL, &[]).unwrap();
        assert_ne!(first, second);
        assert_eq!(generate_nonce().len(), 32);
    }
}

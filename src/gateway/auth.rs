//! Outgoing header sets for the flow service
//!
//! The hosted gateway in front of the flow service has accepted different
//! header shapes at different times. The primary set covers the documented
//! `Authorization: Bearer` form plus two speculative duplicates; the alternates
//! are only tried after a 401.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use sha2::{Digest, Sha256};

pub const X_API_KEY: &str = "x-api-key";
pub const X_ASTRA_TOKEN: &str = "x-astra-token";

/// A named header set, so logs can say which encoding worked
#[derive(Debug, Clone)]
pub struct HeaderSet {
    pub label: &'static str,
    pub headers: HeaderMap,
}

/// A credential that cannot be sent as an HTTP header value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidCredential;

/// Header values for one credential, validated once up front
#[derive(Debug, Clone)]
struct Credential {
    token: String,
    raw: HeaderValue,
    bearer: HeaderValue,
}

/// Builds header sets for one credential (or none)
#[derive(Debug, Clone)]
pub struct AuthHeaders {
    credential: Option<Credential>,
}

impl AuthHeaders {
    /// Fails when the token holds bytes a header cannot carry (newlines,
    /// control characters); such a token would otherwise be silently dropped
    pub fn new(token: Option<&str>) -> Result<Self, InvalidCredential> {
        let Some(token) = token.map(str::trim).filter(|t| !t.is_empty()) else {
            return Ok(Self { credential: None });
        };

        let raw = sensitive(token)?;
        let bearer = sensitive(&format!("Bearer {token}"))?;
        Ok(Self {
            credential: Some(Credential {
                token: token.to_string(),
                raw,
                bearer,
            }),
        })
    }

    pub fn is_anonymous(&self) -> bool {
        self.credential.is_none()
    }

    /// Short hash of the token for log correlation (never log the token itself)
    pub fn token_hash(&self) -> Option<String> {
        self.credential.as_ref().map(|c| {
            let hash = Sha256::digest(c.token.as_bytes());
            format!("{:x}", hash)[..12].to_string()
        })
    }

    /// Primary header set: JSON content type, bearer auth, speculative alternates
    pub fn primary(&self) -> HeaderSet {
        let mut headers = json_headers();
        if let Some(c) = &self.credential {
            headers.insert(AUTHORIZATION, c.bearer.clone());
            headers.insert(HeaderName::from_static(X_API_KEY), c.raw.clone());
            headers.insert(HeaderName::from_static(X_ASTRA_TOKEN), c.raw.clone());
        }
        HeaderSet {
            label: "bearer",
            headers,
        }
    }

    /// Alternate encodings tried after a 401, in order:
    /// raw Authorization, x-api-key only, x-astra-token only
    pub fn alternates(&self) -> Vec<HeaderSet> {
        let Some(c) = &self.credential else {
            return Vec::new();
        };

        [
            ("raw-authorization", AUTHORIZATION),
            ("x-api-key", HeaderName::from_static(X_API_KEY)),
            ("x-astra-token", HeaderName::from_static(X_ASTRA_TOKEN)),
        ]
        .into_iter()
        .map(|(label, name)| {
            let mut headers = json_headers();
            headers.insert(name, c.raw.clone());
            HeaderSet { label, headers }
        })
        .collect()
    }
}

fn json_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers
}

fn sensitive(value: &str) -> Result<HeaderValue, InvalidCredential> {
    let mut value = HeaderValue::from_str(value).map_err(|_| InvalidCredential)?;
    value.set_sensitive(true);
    Ok(value)
}

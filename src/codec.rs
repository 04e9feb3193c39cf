//! Share-link token codec
//!
//! Current tokens are base64url (no padding) of a small JSON envelope:
//!
//! ```json
//! {"a":"Artist","t":"Title","u":"https://open.spotify.com/track/123","v":1}
//! ```
//!
//! Older installs issued plain percent-encoded URLs as tokens. Decoding
//! tries the current format first and falls back to legacy percent-decoding.
//! Tokens that decode to another app share link are unwrapped, at most
//! [`MAX_UNWRAP_DEPTH`] levels deep.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::error::RejectionReason;
use crate::model::{CanonicalUrl, EncodedShareToken, TrackMetadata};
use crate::validator::Validator;

/// Nested share links unwrapped before giving up.
pub const MAX_UNWRAP_DEPTH: usize = 5;

/// Envelope version written by [`ShareCodec::encode`].
pub const TOKEN_VERSION: u64 = 1;

#[derive(Debug, Deserialize)]
struct ShareEnvelope {
    v: u64,
    u: String,
    #[serde(default)]
    t: Option<String>,
    #[serde(default)]
    a: Option<String>,
}

/// Result of decoding a share token
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedShare {
    pub url: CanonicalUrl,
    pub metadata: Option<TrackMetadata>,
}

/// A link found inside an app share link
struct InnerLink {
    token: String,
    metadata: Option<TrackMetadata>,
}

/// Encodes canonical URLs into share tokens and back
///
/// Stateless apart from the validator policy; safe to share across tasks.
#[derive(Debug, Clone)]
pub struct ShareCodec {
    validator: Validator,
}

impl ShareCodec {
    pub fn new(validator: Validator) -> Self {
        Self { validator }
    }

    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    pub fn encode(&self, url: &CanonicalUrl) -> EncodedShareToken {
        self.encode_with_metadata(url, None)
    }

    /// Encode a URL, carrying title and artist inside the token.
    pub fn encode_with_metadata(
        &self,
        url: &CanonicalUrl,
        metadata: Option<&TrackMetadata>,
    ) -> EncodedShareToken {
        let mut envelope = Map::new();
        envelope.insert("v".into(), json!(TOKEN_VERSION));
        envelope.insert("u".into(), json!(url.as_str()));
        if let Some(meta) = metadata {
            envelope.insert("t".into(), json!(meta.title));
            envelope.insert("a".into(), json!(meta.artist));
        }
        let payload = Value::Object(envelope).to_string();
        EncodedShareToken(URL_SAFE_NO_PAD.encode(payload.as_bytes()))
    }

    /// Full `https://<share-domain>/s/<token>` link for a URL.
    pub fn share_link(&self, url: &CanonicalUrl, metadata: Option<&TrackMetadata>) -> String {
        format!(
            "https://{}/s/{}",
            self.validator.policy().share_domain,
            self.encode_with_metadata(url, metadata)
        )
    }

    /// Decode a token into the music URL it points at.
    ///
    /// Passing an already-decoded URL returns it unchanged.
    pub fn decode(&self, token: &str) -> Option<CanonicalUrl> {
        self.decode_detailed(token).ok().map(|decoded| decoded.url)
    }

    /// Like [`ShareCodec::decode`], keeping the metadata and the failure reason.
    pub fn decode_detailed(&self, token: &str) -> Result<DecodedShare, RejectionReason> {
        self.unwrap_at(token, 0)
    }

    /// If `url` is itself an app share link, the token or URL it wraps.
    pub fn inner_link(&self, url: &CanonicalUrl) -> Option<String> {
        self.find_inner(url).map(|inner| inner.token)
    }

    fn unwrap_at(&self, token: &str, depth: usize) -> Result<DecodedShare, RejectionReason> {
        if depth > MAX_UNWRAP_DEPTH {
            debug!("Share link nested deeper than {} levels", MAX_UNWRAP_DEPTH);
            return Err(RejectionReason::RecursionLimitExceeded);
        }

        let (candidate, metadata) = match decode_current(token) {
            Some(envelope) => {
                let metadata = TrackMetadata::from_parts(envelope.t.as_deref(), envelope.a.as_deref());
                (envelope.u, metadata)
            }
            None => (decode_legacy(token)?, None),
        };

        let url = self.validator.validate(&candidate).map_err(|reason| {
            debug!("Decoded share link rejected: {}", reason.code());
            RejectionReason::DecodeFailure
        })?;

        match self.find_inner(&url) {
            Some(inner) => {
                let mut decoded = self.unwrap_at(&inner.token, depth + 1)?;
                decoded.metadata = decoded.metadata.or(inner.metadata).or(metadata);
                Ok(decoded)
            }
            // An app or share-domain link that wraps nothing is not a music URL
            None if self.validator.is_app_link(&url) || self.validator.is_share_domain(&url) => {
                debug!("Share link resolves to the app itself: {}", url);
                Err(RejectionReason::DecodeFailure)
            }
            None => Ok(DecodedShare { url, metadata }),
        }
    }

    fn find_inner(&self, url: &CanonicalUrl) -> Option<InnerLink> {
        if self.validator.is_share_domain(url) {
            return match url.path_segments().as_slice() {
                ["s", token] => Some(InnerLink {
                    token: token.to_string(),
                    metadata: None,
                }),
                _ => None,
            };
        }

        if self.validator.is_app_link(url) {
            return match url.host() {
                "open" => Some(InnerLink {
                    token: url.query_param("url")?,
                    metadata: TrackMetadata::from_parts(
                        url.query_param("title").as_deref(),
                        url.query_param("artist").as_deref(),
                    ),
                }),
                "share" => Some(InnerLink {
                    token: url.query_param("url")?,
                    metadata: None,
                }),
                _ => None,
            };
        }

        None
    }
}

fn decode_current(token: &str) -> Option<ShareEnvelope> {
    if token.is_empty()
        || !token
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
    {
        return None;
    }
    let bytes = URL_SAFE_NO_PAD.decode(token).ok()?;
    let envelope: ShareEnvelope = serde_json::from_slice(&bytes).ok()?;
    (envelope.v == TOKEN_VERSION).then_some(envelope)
}

/// Percent-decode a legacy token. Strings that already are URLs are
/// returned as-is so they are never decoded twice.
fn decode_legacy(token: &str) -> Result<String, RejectionReason> {
    if token.contains("://") {
        return Ok(token.to_string());
    }
    urlencoding::decode(token)
        .map(|decoded| decoded.into_owned())
        .map_err(|_| RejectionReason::DecodeFailure)
}

//! Link classification
//!
//! Maps a raw incoming link to a [`LinkIntent`]. App-scheme and share-domain
//! links are checked before generic platform links, because the decoded
//! payload of a share link is itself a platform link and must not be
//! classified a second time.
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::codec::ShareCodec;
use crate::error::RejectionReason;
use crate::model::{CanonicalUrl, LinkIntent, TrackMetadata};
use crate::validator::Validator;

/// Permissive scan for the first web link inside free text.
static URL_IN_TEXT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)https?://\S+").unwrap());

/// Punctuation that ends a sentence rather than a link.
const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?', ')', ']', '}', '>', '"', '\''];

const MAX_PLAYLIST_ID_LEN: usize = 128;

/// Find the first `http(s)://` link in shared text.
pub fn extract_url(text: &str) -> Option<&str> {
    URL_IN_TEXT_RE
        .find(text)
        .map(|m| m.as_str().trim_end_matches(TRAILING_PUNCTUATION))
}

/// Playlist ids are 1-128 characters of `[A-Za-z0-9_-]`.
pub fn is_valid_playlist_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_PLAYLIST_ID_LEN
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

/// Classifies raw links into intents. Pure and total.
#[derive(Debug, Clone)]
pub struct LinkClassifier {
    codec: ShareCodec,
}

impl LinkClassifier {
    pub fn new(codec: ShareCodec) -> Self {
        Self { codec }
    }

    pub fn codec(&self) -> &ShareCodec {
        &self.codec
    }

    fn validator(&self) -> &Validator {
        self.codec.validator()
    }

    /// Classify a link delivered as a deep link.
    pub fn classify(&self, uri: &str) -> LinkIntent {
        let url = match self.validator().validate(uri) {
            Ok(url) => url,
            Err(reason) => return unrecognized(reason),
        };

        if self.validator().is_app_link(&url) {
            return self.classify_app_link(&url);
        }
        if self.validator().is_share_domain(&url) {
            return self.classify_share_domain(&url);
        }
        if url.platform().is_some() {
            return LinkIntent::OpenDirectMusicLink { url };
        }
        unrecognized(RejectionReason::UntrustedHost)
    }

    /// Classify free text handed over by a share intent or the clipboard.
    ///
    /// A bare platform link found here is something the user wants to send
    /// onward, so it becomes a [`LinkIntent::ShareRequest`].
    pub fn classify_shared_text(&self, text: &str) -> LinkIntent {
        let candidate = extract_url(text).unwrap_or_else(|| text.trim());
        match self.classify(candidate) {
            LinkIntent::OpenDirectMusicLink { url } => LinkIntent::ShareRequest { url },
            other => other,
        }
    }

    fn classify_app_link(&self, url: &CanonicalUrl) -> LinkIntent {
        match url.host() {
            "playlist" => playlist_intent(url.query_param("id")),
            "open" => {
                if let Some(source) = url.query_param("source") {
                    debug!("App link opened from source={}", source);
                }
                let Some(inner) = url.query_param("url") else {
                    return unrecognized(RejectionReason::Malformed);
                };
                let decoded = match self.codec.decode_detailed(&inner) {
                    Ok(decoded) => decoded,
                    Err(reason) => return unrecognized(reason),
                };
                let metadata = TrackMetadata::from_parts(
                    url.query_param("title").as_deref(),
                    url.query_param("artist").as_deref(),
                )
                .or(decoded.metadata);

                match metadata {
                    Some(metadata) => LinkIntent::OpenSharedLink {
                        url: decoded.url,
                        metadata: Some(metadata),
                    },
                    None => LinkIntent::OpenDirectMusicLink { url: decoded.url },
                }
            }
            "share" => {
                let Some(inner) = url.query_param("url") else {
                    return unrecognized(RejectionReason::Malformed);
                };
                match self.codec.decode_detailed(&inner) {
                    Ok(decoded) => LinkIntent::ShareRequest { url: decoded.url },
                    Err(reason) => unrecognized(reason),
                }
            }
            _ => unrecognized(RejectionReason::UntrustedHost),
        }
    }

    fn classify_share_domain(&self, url: &CanonicalUrl) -> LinkIntent {
        match url.path_segments().as_slice() {
            ["s", token] => match self.codec.decode_detailed(token) {
                Ok(decoded) => LinkIntent::OpenSharedLink {
                    url: decoded.url,
                    metadata: decoded.metadata,
                },
                Err(reason) => unrecognized(reason),
            },
            ["p", id] => playlist_intent(Some(id.to_string())),
            _ => unrecognized(RejectionReason::Malformed),
        }
    }
}

fn playlist_intent(id: Option<String>) -> LinkIntent {
    match id {
        Some(playlist_id) if is_valid_playlist_id(&playlist_id) => {
            LinkIntent::ImportPlaylist { playlist_id }
        }
        _ => unrecognized(RejectionReason::Malformed),
    }
}

fn unrecognized(reason: RejectionReason) -> LinkIntent {
    debug!("Link not recognized: {}", reason.code());
    LinkIntent::Unrecognized { reason }
}

//! Data models for link intake
//!
//! This module defines the values that flow through the intake pipeline
//! (canonical URLs, intents, share tokens) and the request/response bodies
//! of the share-domain HTTP API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use url::Url;

use crate::error::RejectionReason;
use crate::platform::Platform;

/// A validated, normalized, allow-listed URL
///
/// Only [`crate::validator::Validator`] constructs these. Equality is exact
/// string equality on the canonical form.
#[derive(Debug, Clone)]
pub struct CanonicalUrl {
    value: String,
    parsed: Url,
}

impl CanonicalUrl {
    pub(crate) fn new(value: String, parsed: Url) -> Self {
        Self { value, parsed }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn scheme(&self) -> &str {
        self.parsed.scheme()
    }

    /// Lower-cased host. For app-scheme links this is the action
    /// (`open`, `playlist`, `share`).
    pub fn host(&self) -> &str {
        self.parsed.host_str().unwrap_or_default()
    }

    pub fn path_segments(&self) -> Vec<&str> {
        self.parsed
            .path_segments()
            .map(|segments| segments.filter(|s| !s.is_empty()).collect())
            .unwrap_or_default()
    }

    /// First value of a query parameter, percent-decoded.
    pub fn query_param(&self, name: &str) -> Option<String> {
        self.parsed
            .query_pairs()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    }

    /// The streaming platform this link points at, if any.
    pub fn platform(&self) -> Option<Platform> {
        Platform::from_host(self.host())
    }
}

impl PartialEq for CanonicalUrl {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Eq for CanonicalUrl {}

impl std::hash::Hash for CanonicalUrl {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl std::fmt::Display for CanonicalUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.value)
    }
}

impl Serialize for CanonicalUrl {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.value)
    }
}

/// Title and artist carried alongside a shared link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackMetadata {
    pub title: String,
    pub artist: String,
}

impl TrackMetadata {
    /// Both fields must be present and non-blank.
    pub fn from_parts(title: Option<&str>, artist: Option<&str>) -> Option<Self> {
        let title = title.map(str::trim).filter(|t| !t.is_empty())?;
        let artist = artist.map(str::trim).filter(|a| !a.is_empty())?;
        Some(Self {
            title: title.to_string(),
            artist: artist.to_string(),
        })
    }
}

/// What an incoming link asks the app to do
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LinkIntent {
    /// A bare platform link (Spotify, Apple Music, ...)
    OpenDirectMusicLink { url: CanonicalUrl },

    /// A self-issued share link, already pointing at the final music URL
    OpenSharedLink {
        url: CanonicalUrl,
        metadata: Option<TrackMetadata>,
    },

    /// A self-issued playlist link
    ImportPlaylist { playlist_id: String },

    /// The user wants to send this link onward
    ShareRequest { url: CanonicalUrl },

    /// Nothing to do; the reason is kept for logging
    Unrecognized { reason: RejectionReason },
}

impl LinkIntent {
    pub fn url(&self) -> Option<&CanonicalUrl> {
        match self {
            LinkIntent::OpenDirectMusicLink { url }
            | LinkIntent::OpenSharedLink { url, .. }
            | LinkIntent::ShareRequest { url } => Some(url),
            LinkIntent::ImportPlaylist { .. } | LinkIntent::Unrecognized { .. } => None,
        }
    }

    /// Opening links can be OS redeliveries; sharing and importing are
    /// always deliberate.
    pub fn is_suppressible(&self) -> bool {
        matches!(
            self,
            LinkIntent::OpenDirectMusicLink { .. } | LinkIntent::OpenSharedLink { .. }
        )
    }

    pub fn kind(&self) -> &'static str {
        match self {
            LinkIntent::OpenDirectMusicLink { .. } => "open_direct_music_link",
            LinkIntent::OpenSharedLink { .. } => "open_shared_link",
            LinkIntent::ImportPlaylist { .. } => "import_playlist",
            LinkIntent::ShareRequest { .. } => "share_request",
            LinkIntent::Unrecognized { .. } => "unrecognized",
        }
    }
}

/// Opaque, URL-path-safe encoding of a canonical URL
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct EncodedShareToken(pub(crate) String);

impl EncodedShareToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EncodedShareToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a raw link came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntakeSource {
    /// OS-level custom-scheme or app-domain deep link
    DeepLink,
    /// Plain text handed over by another app's share action
    ShareIntent,
    /// Clipboard contents read on text-field focus
    Clipboard,
}

/// Request payload for issuing a share link
///
/// # Example
/// ```json
/// {
///   "url": "https://open.spotify.com/track/123",
///   "title": "Song",
///   "artist": "Artist"
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct CreateShareRequest {
    /// The music link to share
    pub url: String,

    /// Optional title, carried inside the token
    pub title: Option<String>,

    /// Optional artist, carried inside the token
    pub artist: Option<String>,
}

/// Response returned after issuing a share link
#[derive(Debug, Serialize)]
pub struct CreateShareResponse {
    /// The encoded share token
    pub token: EncodedShareToken,

    /// Full share link on the app's share domain
    pub share_url: String,

    /// Canonical form of the submitted link
    pub url: CanonicalUrl,

    pub created_at: DateTime<Utc>,
}

/// Request payload for running one delivery through intake
///
/// # Example
/// ```json
/// {
///   "source": "share_intent",
///   "text": "Check this out https://open.spotify.com/track/abc?si=xyz"
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct IntakeRequest {
    pub source: IntakeSource,
    pub text: String,
}

//! Known music platforms and the host allow-list
//!
//! A host is trusted when it equals one of a platform's domains or is a
//! subdomain of one. Link-shortener domains operated by the platforms
//! (`spotify.link`, `on.soundcloud.com`, ...) are listed alongside the main
//! domains.

use serde::{Deserialize, Serialize};

/// A streaming service a link can point at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Platform {
    Spotify,
    AppleMusic,
    YoutubeMusic,
    Youtube,
    Deezer,
    Tidal,
    AmazonMusic,
    Soundcloud,
    Pandora,
}

impl Platform {
    pub const ALL: [Platform; 9] = [
        Platform::Spotify,
        Platform::AppleMusic,
        Platform::YoutubeMusic,
        Platform::Youtube,
        Platform::Deezer,
        Platform::Tidal,
        Platform::AmazonMusic,
        Platform::Soundcloud,
        Platform::Pandora,
    ];

    /// Identifier used by the Link Resolution API and in configuration.
    pub fn id(&self) -> &'static str {
        match self {
            Platform::Spotify => "spotify",
            Platform::AppleMusic => "appleMusic",
            Platform::YoutubeMusic => "youtubeMusic",
            Platform::Youtube => "youtube",
            Platform::Deezer => "deezer",
            Platform::Tidal => "tidal",
            Platform::AmazonMusic => "amazonMusic",
            Platform::Soundcloud => "soundcloud",
            Platform::Pandora => "pandora",
        }
    }

    pub fn from_id(id: &str) -> Option<Platform> {
        Platform::ALL.into_iter().find(|p| p.id() == id)
    }

    /// Domains (and their subdomains) served by this platform.
    pub fn domains(&self) -> &'static [&'static str] {
        match self {
            Platform::Spotify => &["open.spotify.com", "play.spotify.com", "spotify.link", "spotify.app.link"],
            Platform::AppleMusic => &["music.apple.com", "itunes.apple.com", "geo.music.apple.com"],
            // music.youtube.com must be matched before youtube.com
            Platform::YoutubeMusic => &["music.youtube.com"],
            Platform::Youtube => &["youtube.com", "youtu.be"],
            Platform::Deezer => &["deezer.com", "deezer.page.link", "link.deezer.com"],
            Platform::Tidal => &["tidal.com"],
            Platform::AmazonMusic => &["music.amazon.com", "music.amazon.co.uk", "music.amazon.de"],
            Platform::Soundcloud => &["soundcloud.com", "on.soundcloud.com"],
            Platform::Pandora => &["pandora.com", "pandora.app.link"],
        }
    }

    /// Match a lower-cased host against the allow-list.
    pub fn from_host(host: &str) -> Option<Platform> {
        Platform::ALL
            .into_iter()
            .find(|p| p.domains().iter().any(|d| host_matches(host, d)))
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

/// True when `host` is `domain` or a subdomain of it.
pub fn host_matches(host: &str, domain: &str) -> bool {
    host == domain
        || host
            .strip_suffix(domain)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

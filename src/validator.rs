//! URL validation and canonicalization
//!
//! Every raw string that enters the intake pipeline passes through
//! [`Validator::validate`] before anything acts on it. The validator:
//! 1. Rejects control characters, whitespace and over-long input
//! 2. Percent-decodes up to [`MAX_DECODE_ROUNDS`] times to inspect hidden content
//! 3. Restricts schemes to `http`, `https` and the app's own scheme
//! 4. Restricts hosts to the platform allow-list and the share domain
//! 5. Drops known tracking parameters, default ports, fragments and trailing slashes

use std::sync::Arc;

use url::{Host, Url};

use crate::error::RejectionReason;
use crate::model::CanonicalUrl;
use crate::platform::{host_matches, Platform};

/// Longest raw input accepted. Nested share tokens grow quickly, so this is
/// generous compared to a typical browser limit.
pub const MAX_URL_LENGTH: usize = 8192;

/// Percent-decoding rounds allowed before input counts as over-encoded.
pub const MAX_DECODE_ROUNDS: usize = 2;

/// Authorities understood under the app's custom scheme.
pub const APP_ACTIONS: [&str; 3] = ["open", "playlist", "share"];

/// Query parameters that only carry attribution and never affect which
/// track, album or playlist a link points at.
const TRACKING_PARAMS: &[&str] = &[
    "fbclid",
    "gclid",
    "dclid",
    "msclkid",
    "igshid",
    "mc_cid",
    "mc_eid",
    "feature",
    "_branch_match_id",
    "_branch_referrer",
];

/// Which scheme and share domain belong to this app
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkPolicy {
    /// Custom URI scheme registered by the app, lower-case, without `://`
    pub app_scheme: String,

    /// The app's own https share domain, lower-case
    pub share_domain: String,
}

impl Default for LinkPolicy {
    fn default() -> Self {
        Self {
            app_scheme: "unitune".to_string(),
            share_domain: "unitune.art".to_string(),
        }
    }
}

/// Turns raw strings into [`CanonicalUrl`]s
#[derive(Debug, Clone)]
pub struct Validator {
    policy: Arc<LinkPolicy>,
}

impl Validator {
    pub fn new(policy: LinkPolicy) -> Self {
        Self {
            policy: Arc::new(policy),
        }
    }

    pub fn policy(&self) -> &LinkPolicy {
        &self.policy
    }

    pub fn is_app_link(&self, url: &CanonicalUrl) -> bool {
        url.scheme() == self.policy.app_scheme
    }

    pub fn is_share_domain(&self, url: &CanonicalUrl) -> bool {
        !self.is_app_link(url) && host_matches(url.host(), &self.policy.share_domain)
    }

    /// Validate and canonicalize a raw link.
    ///
    /// Deterministic and side-effect free. The canonical form of an
    /// accepted link validates to itself.
    pub fn validate(&self, raw: &str) -> Result<CanonicalUrl, RejectionReason> {
        let raw = raw.trim();
        if raw.is_empty() || raw.len() > MAX_URL_LENGTH {
            return Err(RejectionReason::Malformed);
        }
        // The url parser silently strips tabs and newlines, so check first
        if raw.chars().any(|c| c.is_control() || c.is_whitespace()) {
            return Err(RejectionReason::Malformed);
        }
        check_encoding_depth(raw)?;

        let parsed = Url::parse(raw).map_err(|_| RejectionReason::Malformed)?;

        let scheme = parsed.scheme().to_ascii_lowercase();
        let is_app = scheme == self.policy.app_scheme;
        if !is_app && scheme != "http" && scheme != "https" {
            return Err(RejectionReason::UnsupportedScheme);
        }

        if !parsed.username().is_empty() || parsed.password().is_some() {
            return Err(RejectionReason::UntrustedHost);
        }

        let host = match parsed.host() {
            Some(Host::Domain(domain)) => domain.trim_end_matches('.').to_ascii_lowercase(),
            Some(Host::Ipv4(_)) | Some(Host::Ipv6(_)) => {
                return Err(RejectionReason::UntrustedHost)
            }
            None if is_app => return Err(RejectionReason::Malformed),
            None => return Err(RejectionReason::UntrustedHost),
        };

        let trusted = if is_app {
            APP_ACTIONS.contains(&host.as_str())
        } else {
            host_matches(&host, &self.policy.share_domain) || Platform::from_host(&host).is_some()
        };
        if !trusted {
            return Err(RejectionReason::UntrustedHost);
        }

        let port = parsed.port().map(|p| format!(":{p}")).unwrap_or_default();
        // Every trailing slash goes; dropping only one would not be idempotent
        let path = parsed.path().trim_end_matches('/');
        let query = match parsed.query() {
            Some(q) if is_app => q.to_string(),
            Some(q) => strip_tracking(q),
            None => String::new(),
        };

        let mut value = format!("{scheme}://{host}{port}{path}");
        if !query.is_empty() {
            value.push('?');
            value.push_str(&query);
        }

        let canonical = Url::parse(&value).map_err(|_| RejectionReason::Malformed)?;
        Ok(CanonicalUrl::new(value, canonical))
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(LinkPolicy::default())
    }
}

/// Decode at most [`MAX_DECODE_ROUNDS`] times, rejecting control characters
/// revealed by decoding and input that would still change on another round.
fn check_encoding_depth(raw: &str) -> Result<(), RejectionReason> {
    let mut current = raw.to_string();
    for _ in 0..MAX_DECODE_ROUNDS {
        let decoded = percent_decode_once(&current)?;
        if decoded.chars().any(char::is_control) {
            return Err(RejectionReason::Malformed);
        }
        if decoded == current {
            return Ok(());
        }
        current = decoded;
    }

    if percent_decode_once(&current)? != current {
        return Err(RejectionReason::EncodingTooDeep);
    }
    Ok(())
}

fn percent_decode_once(input: &str) -> Result<String, RejectionReason> {
    urlencoding::decode(input)
        .map(|decoded| decoded.into_owned())
        .map_err(|_| RejectionReason::Malformed)
}

fn is_tracking_param(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key.as_str())
}

/// Drop tracking parameters, keep everything else in its original order
/// and encoding.
fn strip_tracking(query: &str) -> String {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter(|pair| {
            let key = pair.split_once('=').map_or(*pair, |(k, _)| k);
            !is_tracking_param(key)
        })
        .collect::<Vec<_>>()
        .join("&")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validate(raw: &str) -> Result<String, RejectionReason> {
        Validator::default().validate(raw).map(|u| u.as_str().to_string())
    }

    #[test]
    fn rejects_dangerous_and_foreign_links() {
        assert_eq!(validate("javascript:alert(1)"), Err(RejectionReason::UnsupportedScheme));
        assert_eq!(validate("ftp://x"), Err(RejectionReason::UnsupportedScheme));
        assert_eq!(
            validate("https://evil.example.com/open.spotify.com"),
            Err(RejectionReason::UntrustedHost)
        );
        assert_eq!(
            validate("https://open.spotify.com@evil.example.com/track/1"),
            Err(RejectionReason::UntrustedHost)
        );
        assert_eq!(validate("https://127.0.0.1/track/1"), Err(RejectionReason::UntrustedHost));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(validate(""), Err(RejectionReason::Malformed));
        assert_eq!(validate("not a url"), Err(RejectionReason::Malformed));
        assert_eq!(
            validate("https://open.spotify.com/track/1\n"),
            Ok("https://open.spotify.com/track/1".to_string())
        );
        assert_eq!(
            validate("https://open.spotify.com/tr\tack/1"),
            Err(RejectionReason::Malformed)
        );
        let long = format!("https://open.spotify.com/track/{}", "a".repeat(MAX_URL_LENGTH));
        assert_eq!(validate(&long), Err(RejectionReason::Malformed));
    }

    #[test]
    fn normalizes_host_port_and_trailing_slash() {
        assert_eq!(
            validate("HTTPS://Open.Spotify.COM:443/track/123/").unwrap(),
            "https://open.spotify.com/track/123"
        );
        assert_eq!(validate("https://open.spotify.com/").unwrap(), "https://open.spotify.com");
        assert_eq!(
            validate("https://music.apple.com/us/album/x/1?i=2#top").unwrap(),
            "https://music.apple.com/us/album/x/1?i=2"
        );
    }

    #[test]
    fn strips_repeated_trailing_slashes_to_a_fixed_point() {
        let once = validate("https://open.spotify.com/track/123//").unwrap();
        assert_eq!(once, "https://open.spotify.com/track/123");
        assert_eq!(validate(&once).unwrap(), once);
        assert_eq!(
            validate("https://open.spotify.com/track/123//?si=a").unwrap(),
            "https://open.spotify.com/track/123?si=a"
        );
    }

    #[test]
    fn strips_only_known_tracking_params() {
        assert_eq!(
            validate("https://open.spotify.com/track/abc?si=xyz&utm_source=copy-link&context=spotify%3Aalbum%3A1&foo=bar")
                .unwrap(),
            "https://open.spotify.com/track/abc?si=xyz&context=spotify%3Aalbum%3A1&foo=bar"
        );
        assert_eq!(
            validate("https://www.youtube.com/watch?v=dQw4w9WgXcQ&feature=share").unwrap(),
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ"
        );
        assert_eq!(
            validate("https://open.spotify.com/track/abc?fbclid=1").unwrap(),
            "https://open.spotify.com/track/abc"
        );
    }

    #[test]
    fn limits_percent_decoding_depth() {
        // double-encoded 'A' is fine, triple-encoded is not
        assert!(validate("https://open.spotify.com/track/%2541").is_ok());
        assert_eq!(
            validate("https://open.spotify.com/track/%252541"),
            Err(RejectionReason::EncodingTooDeep)
        );
    }

    #[test]
    fn rejects_encoded_control_characters() {
        assert_eq!(validate("https://open.spotify.com/track/%00"), Err(RejectionReason::Malformed));
        assert_eq!(
            validate("https://open.spotify.com/track/%250A"),
            Err(RejectionReason::Malformed)
        );
    }

    #[test]
    fn accepts_app_scheme_actions_only() {
        assert_eq!(
            validate("unitune://open?url=https%3A%2F%2Fopen.spotify.com%2Ftrack%2F123").unwrap(),
            "unitune://open?url=https%3A%2F%2Fopen.spotify.com%2Ftrack%2F123"
        );
        assert!(validate("UNITUNE://Playlist?id=abc").is_ok());
        assert_eq!(validate("unitune://settings"), Err(RejectionReason::UntrustedHost));
        assert_eq!(validate("otherapp://open?url=x"), Err(RejectionReason::UnsupportedScheme));
    }

    #[test]
    fn accepts_share_domain_and_subdomains() {
        assert!(validate("https://unitune.art/s/abc").is_ok());
        assert!(validate("https://www.unitune.art/p/abc").is_ok());
        assert_eq!(validate("https://unitune.art.evil.example/s/abc"), Err(RejectionReason::UntrustedHost));
    }

    #[test]
    fn canonical_form_is_a_fixed_point() {
        let inputs = [
            "HTTPS://Open.Spotify.COM:443/track/123/?utm_campaign=x&si=1",
            "https://music.youtube.com/watch?v=abc&list=RD",
            "unitune://open?url=https%3A%2F%2Fopen.spotify.com%2Ftrack%2F1&title=A%20B",
            "https://open.spotify.com",
        ];
        for input in inputs {
            let once = validate(input).unwrap();
            assert_eq!(validate(&once).unwrap(), once, "input: {input}");
        }
    }
}

//! Link Resolution API client
//!
//! Finds the same song on other platforms. The coordinator only depends on
//! the [`LinkResolver`] trait, so tests substitute mock implementations.
//!
//! The production client talks to the Odesli (song.link) API:
//! `GET <base>?url=<link>&userCountry=<cc>`

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::ResolveError;
use crate::model::{CanonicalUrl, TrackMetadata};
use crate::platform::Platform;

pub const DEFAULT_RESOLVER_URL: &str = "https://api.song.link/v1-alpha.1/links";

/// Same-song links on other platforms, plus whatever metadata came with them
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResolvedLinks {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub thumbnail_url: Option<String>,
    pub links_by_platform: HashMap<Platform, String>,
}

impl ResolvedLinks {
    pub fn metadata(&self) -> Option<TrackMetadata> {
        TrackMetadata::from_parts(self.title.as_deref(), self.artist.as_deref())
    }
}

/// Trait for the external Link Resolution API.
#[async_trait]
pub trait LinkResolver: Send + Sync {
    /// Look up same-song links for a canonical URL.
    async fn resolve(&self, url: &CanonicalUrl) -> Result<ResolvedLinks, ResolveError>;
}

/// Odesli HTTP client
pub struct OdesliResolver {
    http_client: reqwest::Client,
    base_url: String,
    user_country: String,
}

impl OdesliResolver {
    /// Create a client against `base_url`.
    ///
    /// Accepts gzip responses and identifies itself with the crate name and
    /// version. Timeouts are left to the service.
    pub fn new(
        base_url: impl Into<String>,
        user_country: impl Into<String>,
    ) -> Result<Self, ResolveError> {
        let http_client = reqwest::Client::builder()
            .gzip(true)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http_client,
            base_url: base_url.into(),
            user_country: user_country.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request_url(&self, url: &CanonicalUrl) -> String {
        format!(
            "{}?url={}&userCountry={}",
            self.base_url,
            urlencoding::encode(url.as_str()),
            urlencoding::encode(&self.user_country)
        )
    }
}

#[async_trait]
impl LinkResolver for OdesliResolver {
    async fn resolve(&self, url: &CanonicalUrl) -> Result<ResolvedLinks, ResolveError> {
        let request_url = self.request_url(url);
        debug!("Resolving {} via {}", url, self.base_url);

        let response = self.http_client.get(&request_url).send().await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ResolveError::NotFound);
        }
        if !status.is_success() {
            warn!("Resolver returned HTTP {}", status);
            return Err(ResolveError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        let parsed: dto::LinksResponse = serde_json::from_str(&body)
            .map_err(|e| ResolveError::InvalidResponse(e.to_string()))?;
        adapter::to_resolved(parsed)
    }
}

/// Odesli response shapes. Only the fields we read are declared.
mod dto {
    use std::collections::HashMap;

    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct LinksResponse {
        pub entity_unique_id: String,
        #[serde(default)]
        pub entities_by_unique_id: HashMap<String, Entity>,
        #[serde(default)]
        pub links_by_platform: HashMap<String, PlatformLink>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Entity {
        pub title: Option<String>,
        pub artist_name: Option<String>,
        pub thumbnail_url: Option<String>,
    }

    #[derive(Debug, Deserialize)]
    pub struct PlatformLink {
        pub url: String,
    }
}

mod adapter {
    use super::*;

    pub fn to_resolved(response: dto::LinksResponse) -> Result<ResolvedLinks, ResolveError> {
        let links_by_platform: HashMap<Platform, String> = response
            .links_by_platform
            .into_iter()
            .filter_map(|(id, link)| Platform::from_id(&id).map(|p| (p, link.url)))
            .collect();

        if links_by_platform.is_empty() {
            return Err(ResolveError::NotFound);
        }

        let entity = response
            .entities_by_unique_id
            .get(&response.entity_unique_id);

        Ok(ResolvedLinks {
            title: entity.and_then(|e| e.title.clone()),
            artist: entity.and_then(|e| e.artist_name.clone()),
            thumbnail_url: entity.and_then(|e| e.thumbnail_url.clone()),
            links_by_platform,
        })
    }
}

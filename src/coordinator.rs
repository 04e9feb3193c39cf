//! Intake coordinator
//!
//! The decision logic is the pure [`transition`] function: it takes the
//! current [`IntakeState`] and an [`IntakeEvent`] and returns the next state
//! plus the [`Effect`]s to perform. [`IntakeCoordinator`] is the thin shell
//! that runs one delivery through the machine, performing effects (replay
//! check, resolver call, navigation) and feeding their results back in.
//!
//! ```text
//! Idle -> Classifying -> Dispatched
//!                     -> AwaitingExternalResolution -> Dispatched
//!                                                   -> Rejected
//!                     -> Rejected
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::classifier::LinkClassifier;
use crate::error::RejectionReason;
use crate::model::{CanonicalUrl, IntakeSource, LinkIntent, TrackMetadata};
use crate::platform::Platform;
use crate::resolver::{LinkResolver, ResolvedLinks};
use crate::suppressor::DuplicateSuppressor;

/// One raw string from one intake source
#[derive(Debug, Clone)]
pub struct Delivery {
    pub source: IntakeSource,
    pub raw: String,
    pub received_at: Instant,
}

impl Delivery {
    pub fn new(source: IntakeSource, raw: impl Into<String>, received_at: Instant) -> Self {
        Self {
            source,
            raw: raw.into(),
            received_at,
        }
    }

    pub fn now(source: IntakeSource, raw: impl Into<String>) -> Self {
        Self::new(source, raw, Instant::now())
    }
}

/// What the rest of the app should do with a delivery
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum NavigationTarget {
    OpenInExternalApp {
        url: CanonicalUrl,
        metadata: Option<TrackMetadata>,
    },
    ShowSharingUi {
        url: CanonicalUrl,
        share_url: String,
        metadata: Option<TrackMetadata>,
        thumbnail_url: Option<String>,
        links_by_platform: HashMap<Platform, CanonicalUrl>,
    },
    NavigateToPlaylistImport {
        playlist_id: String,
    },
    ShowError {
        reason: RejectionReason,
        message: &'static str,
        retryable: bool,
    },
}

impl NavigationTarget {
    fn error(reason: RejectionReason) -> Self {
        NavigationTarget::ShowError {
            reason,
            message: reason.user_message(),
            retryable: reason.is_retryable(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum IntakeState {
    Idle,
    Classifying { intent: LinkIntent },
    AwaitingExternalResolution { intent: LinkIntent },
    Dispatched { intent: LinkIntent, target: NavigationTarget },
    /// `notify` is false for rejections the user should not see
    Rejected { reason: RejectionReason, notify: bool },
}

impl IntakeState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, IntakeState::Dispatched { .. } | IntakeState::Rejected { .. })
    }
}

#[derive(Debug, Clone)]
pub enum IntakeEvent {
    Delivered(Delivery),
    ReplayChecked { replay: bool },
    Resolved(Result<ResolvedLinks, RejectionReason>),
}

/// Side effects requested by [`transition`]
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Consult (and update) the duplicate suppressor
    CheckReplay { url: CanonicalUrl, at: Instant },
    /// Call the Link Resolution API
    CallResolver { url: CanonicalUrl },
    /// Hand a target to the navigation layer
    Navigate(NavigationTarget),
}

/// Read-only inputs to [`transition`]
pub struct TransitionContext<'a> {
    pub classifier: &'a LinkClassifier,
    pub preferred_platform: Option<Platform>,
}

/// Compute the next state and the effects to perform.
///
/// Events that make no sense in the current state leave it unchanged.
pub fn transition(
    ctx: &TransitionContext<'_>,
    state: IntakeState,
    event: IntakeEvent,
) -> (IntakeState, Vec<Effect>) {
    match (state, event) {
        (IntakeState::Idle, IntakeEvent::Delivered(delivery)) => {
            let intent = match delivery.source {
                IntakeSource::DeepLink => ctx.classifier.classify(&delivery.raw),
                IntakeSource::ShareIntent | IntakeSource::Clipboard => {
                    ctx.classifier.classify_shared_text(&delivery.raw)
                }
            };
            debug!("Classified {:?} delivery as {}", delivery.source, intent.kind());

            if let LinkIntent::Unrecognized { reason } = intent {
                // The clipboard is read opportunistically; stay quiet about it
                let notify = delivery.source != IntakeSource::Clipboard;
                return reject(reason, notify);
            }

            match intent.url() {
                Some(url) if intent.is_suppressible() => {
                    let effect = Effect::CheckReplay {
                        url: url.clone(),
                        at: delivery.received_at,
                    };
                    (IntakeState::Classifying { intent }, vec![effect])
                }
                _ => leave_classifying(intent),
            }
        }

        (IntakeState::Classifying { intent }, IntakeEvent::ReplayChecked { replay }) => {
            if replay {
                debug!("Dropping replayed {}", intent.kind());
                (IntakeState::Idle, Vec::new())
            } else {
                leave_classifying(intent)
            }
        }

        (IntakeState::AwaitingExternalResolution { intent }, IntakeEvent::Resolved(result)) => {
            match result {
                Ok(links) => after_resolution(ctx, intent, links),
                Err(reason) => reject(reason, true),
            }
        }

        (state, event) => {
            warn!("Ignoring {:?} in state {:?}", event, state);
            (state, Vec::new())
        }
    }
}

fn leave_classifying(intent: LinkIntent) -> (IntakeState, Vec<Effect>) {
    match intent {
        LinkIntent::OpenSharedLink { ref url, ref metadata } => {
            let target = NavigationTarget::OpenInExternalApp {
                url: url.clone(),
                metadata: metadata.clone(),
            };
            dispatch(intent, target)
        }
        LinkIntent::ImportPlaylist { ref playlist_id } => {
            let target = NavigationTarget::NavigateToPlaylistImport {
                playlist_id: playlist_id.clone(),
            };
            dispatch(intent, target)
        }
        LinkIntent::OpenDirectMusicLink { ref url } | LinkIntent::ShareRequest { ref url } => {
            let effect = Effect::CallResolver { url: url.clone() };
            (IntakeState::AwaitingExternalResolution { intent }, vec![effect])
        }
        LinkIntent::Unrecognized { reason } => reject(reason, true),
    }
}

fn after_resolution(
    ctx: &TransitionContext<'_>,
    intent: LinkIntent,
    links: ResolvedLinks,
) -> (IntakeState, Vec<Effect>) {
    let validator = ctx.classifier.codec().validator();
    // Resolver output is untrusted; only validated links become targets
    let validated: HashMap<Platform, CanonicalUrl> = links
        .links_by_platform
        .iter()
        .filter_map(|(platform, raw)| validator.validate(raw).ok().map(|url| (*platform, url)))
        .collect();
    let metadata = links.metadata();

    let target = match &intent {
        LinkIntent::OpenDirectMusicLink { url } => {
            let preferred = ctx
                .preferred_platform
                .and_then(|platform| validated.get(&platform).cloned());
            NavigationTarget::OpenInExternalApp {
                url: preferred.unwrap_or_else(|| url.clone()),
                metadata,
            }
        }
        LinkIntent::ShareRequest { url } => NavigationTarget::ShowSharingUi {
            url: url.clone(),
            share_url: ctx.classifier.codec().share_link(url, metadata.as_ref()),
            metadata,
            thumbnail_url: links.thumbnail_url.clone(),
            links_by_platform: validated,
        },
        other => {
            warn!("Resolution finished for unexpected intent {}", other.kind());
            return reject(RejectionReason::Malformed, true);
        }
    };
    dispatch(intent, target)
}

fn dispatch(intent: LinkIntent, target: NavigationTarget) -> (IntakeState, Vec<Effect>) {
    let effect = Effect::Navigate(target.clone());
    (IntakeState::Dispatched { intent, target }, vec![effect])
}

fn reject(reason: RejectionReason, notify: bool) -> (IntakeState, Vec<Effect>) {
    let effects = if notify {
        vec![Effect::Navigate(NavigationTarget::error(reason))]
    } else {
        Vec::new()
    };
    (IntakeState::Rejected { reason, notify }, effects)
}

/// Result of running one delivery
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum IntakeOutcome {
    Dispatched {
        intent: LinkIntent,
        target: NavigationTarget,
    },
    /// A replay of the previous delivery
    Suppressed { intent: LinkIntent },
    /// Rejected with a user-facing error
    Rejected {
        reason: RejectionReason,
        target: NavigationTarget,
    },
    /// Rejected silently
    Ignored { reason: RejectionReason },
}

/// Runs deliveries through [`transition`], performing its effects
///
/// Deliveries are handled independently as they arrive; a delivery that
/// arrives while another is waiting on the resolver is classified and
/// dispatched or suppressed on its own.
pub struct IntakeCoordinator {
    classifier: LinkClassifier,
    suppressor: DuplicateSuppressor,
    resolver: Arc<dyn LinkResolver>,
    preferred_platform: Option<Platform>,
}

impl IntakeCoordinator {
    pub fn new(
        classifier: LinkClassifier,
        suppressor: DuplicateSuppressor,
        resolver: Arc<dyn LinkResolver>,
        preferred_platform: Option<Platform>,
    ) -> Self {
        Self {
            classifier,
            suppressor,
            resolver,
            preferred_platform,
        }
    }

    pub fn classifier(&self) -> &LinkClassifier {
        &self.classifier
    }

    pub fn suppressor(&self) -> &DuplicateSuppressor {
        &self.suppressor
    }

    /// Handle one delivery from start to a terminal state.
    pub async fn handle(&self, delivery: Delivery) -> IntakeOutcome {
        let ctx = TransitionContext {
            classifier: &self.classifier,
            preferred_platform: self.preferred_platform,
        };

        let mut last_intent = None;
        let mut navigation = None;
        let (mut state, mut effects) =
            transition(&ctx, IntakeState::Idle, IntakeEvent::Delivered(delivery));

        loop {
            if let IntakeState::Classifying { intent } = &state {
                last_intent = Some(intent.clone());
            }

            let mut next_event = None;
            for effect in effects.drain(..) {
                match effect {
                    Effect::CheckReplay { url, at } => {
                        let replay = self.suppressor.check_and_mark(&url, at);
                        next_event = Some(IntakeEvent::ReplayChecked { replay });
                    }
                    Effect::CallResolver { url } => {
                        let result = self.resolver.resolve(&url).await.map_err(|e| {
                            warn!("Link resolution failed for {}: {}", url, e);
                            RejectionReason::ResolutionUnavailable
                        });
                        next_event = Some(IntakeEvent::Resolved(result));
                    }
                    Effect::Navigate(target) => {
                        navigation = Some(target);
                    }
                }
            }

            match next_event {
                Some(event) => (state, effects) = transition(&ctx, state, event),
                None => break,
            }
        }

        match (state, navigation) {
            (IntakeState::Dispatched { intent, target }, _) => {
                info!("Dispatched {} delivery", intent.kind());
                IntakeOutcome::Dispatched { intent, target }
            }
            (IntakeState::Rejected { reason, .. }, navigation) => {
                // A rejected delivery was never acted on; a retry must not count as a replay
                if let Some(url) = last_intent.as_ref().and_then(LinkIntent::url) {
                    self.suppressor.forget(url);
                }
                match navigation {
                    Some(target) => {
                        warn!("Rejected delivery: {}", reason.code());
                        IntakeOutcome::Rejected { reason, target }
                    }
                    None => {
                        debug!("Ignored delivery: {}", reason.code());
                        IntakeOutcome::Ignored { reason }
                    }
                }
            }
            (IntakeState::Idle, _) => match last_intent {
                Some(intent) => IntakeOutcome::Suppressed { intent },
                None => {
                    warn!("Delivery returned to idle without being classified");
                    IntakeOutcome::Ignored {
                        reason: RejectionReason::Malformed,
                    }
                }
            },
            (state, _) => {
                warn!("Delivery stopped in non-terminal state {:?}", state);
                IntakeOutcome::Ignored {
                    reason: RejectionReason::Malformed,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::ShareCodec;
    use crate::error::ResolveError;
    use crate::validator::Validator;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    const SPOTIFY: &str = "https://open.spotify.com/track/123";
    const APPLE: &str = "https://music.apple.com/us/album/song/1?i=2";

    #[derive(Default)]
    struct MockResolver {
        calls: AtomicUsize,
        fail: bool,
        apple_url: Option<&'static str>,
    }

    #[async_trait]
    impl LinkResolver for MockResolver {
        async fn resolve(&self, _url: &CanonicalUrl) -> Result<ResolvedLinks, ResolveError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ResolveError::Status(503));
            }
            let mut links = HashMap::new();
            links.insert(Platform::Spotify, SPOTIFY.to_string());
            links.insert(Platform::AppleMusic, self.apple_url.unwrap_or(APPLE).to_string());
            Ok(ResolvedLinks {
                title: Some("Song".into()),
                artist: Some("Artist".into()),
                thumbnail_url: None,
                links_by_platform: links,
            })
        }
    }

    fn classifier() -> LinkClassifier {
        LinkClassifier::new(ShareCodec::new(Validator::default()))
    }

    fn coordinator(resolver: Arc<MockResolver>, preferred: Option<Platform>) -> IntakeCoordinator {
        IntakeCoordinator::new(classifier(), DuplicateSuppressor::default(), resolver, preferred)
    }

    fn deep_link(raw: &str, at: Instant) -> Delivery {
        Delivery::new(IntakeSource::DeepLink, raw, at)
    }

    #[test]
    fn open_links_ask_for_a_replay_check_first() {
        let classifier = classifier();
        let ctx = TransitionContext { classifier: &classifier, preferred_platform: None };
        let at = Instant::now();

        let (state, effects) = transition(&ctx, IntakeState::Idle, IntakeEvent::Delivered(deep_link(SPOTIFY, at)));
        assert!(matches!(state, IntakeState::Classifying { .. }));
        assert!(matches!(&effects[..], [Effect::CheckReplay { at: t, .. }] if *t == at));

        let (state, effects) = transition(&ctx, state, IntakeEvent::ReplayChecked { replay: false });
        assert!(matches!(state, IntakeState::AwaitingExternalResolution { .. }));
        assert!(matches!(&effects[..], [Effect::CallResolver { url }] if url.as_str() == SPOTIFY));
    }

    #[test]
    fn replay_returns_to_idle_without_effects() {
        let classifier = classifier();
        let ctx = TransitionContext { classifier: &classifier, preferred_platform: None };
        let state = IntakeState::Classifying {
            intent: classifier.classify(SPOTIFY),
        };
        let (state, effects) = transition(&ctx, state, IntakeEvent::ReplayChecked { replay: true });
        assert_eq!(state, IntakeState::Idle);
        assert!(effects.is_empty());
    }

    #[test]
    fn unexpected_events_leave_state_alone() {
        let classifier = classifier();
        let ctx = TransitionContext { classifier: &classifier, preferred_platform: None };
        let (state, effects) = transition(&ctx, IntakeState::Idle, IntakeEvent::ReplayChecked { replay: false });
        assert_eq!(state, IntakeState::Idle);
        assert!(effects.is_empty());
    }

    #[test]
    fn resolver_failure_is_rejected_with_retryable_error() {
        let classifier = classifier();
        let ctx = TransitionContext { classifier: &classifier, preferred_platform: None };
        let state = IntakeState::AwaitingExternalResolution {
            intent: classifier.classify(SPOTIFY),
        };
        let (state, effects) = transition(
            &ctx,
            state,
            IntakeEvent::Resolved(Err(RejectionReason::ResolutionUnavailable)),
        );
        assert!(state.is_terminal());
        assert!(matches!(
            &effects[..],
            [Effect::Navigate(NavigationTarget::ShowError { retryable: true, .. })]
        ));
    }

    #[tokio::test]
    async fn shared_link_with_metadata_skips_resolution() {
        let resolver = Arc::new(MockResolver::default());
        let coordinator = coordinator(resolver.clone(), Some(Platform::AppleMusic));

        let outcome = coordinator
            .handle(Delivery::now(
                IntakeSource::DeepLink,
                "unitune://open?url=https%3A%2F%2Fopen.spotify.com%2Ftrack%2F123&title=Song&artist=Artist",
            ))
            .await;

        match outcome {
            IntakeOutcome::Dispatched {
                target: NavigationTarget::OpenInExternalApp { url, metadata },
                ..
            } => {
                assert_eq!(url.as_str(), SPOTIFY);
                assert_eq!(metadata.unwrap().title, "Song");
            }
            other => panic!("Expected dispatch, got {other:?}"),
        }
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn direct_link_opens_preferred_platform() {
        let resolver = Arc::new(MockResolver::default());
        let coordinator = coordinator(resolver.clone(), Some(Platform::AppleMusic));

        let outcome = coordinator.handle(Delivery::now(IntakeSource::DeepLink, SPOTIFY)).await;
        match outcome {
            IntakeOutcome::Dispatched {
                intent: LinkIntent::OpenDirectMusicLink { .. },
                target: NavigationTarget::OpenInExternalApp { url, .. },
            } => assert_eq!(url.as_str(), APPLE),
            other => panic!("Expected dispatch, got {other:?}"),
        }
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn untrusted_resolver_links_fall_back_to_original() {
        let resolver = Arc::new(MockResolver {
            apple_url: Some("https://evil.example.com/apple"),
            ..Default::default()
        });
        let coordinator = coordinator(resolver, Some(Platform::AppleMusic));

        let outcome = coordinator.handle(Delivery::now(IntakeSource::DeepLink, SPOTIFY)).await;
        assert!(matches!(
            outcome,
            IntakeOutcome::Dispatched { target: NavigationTarget::OpenInExternalApp { ref url, .. }, .. }
                if url.as_str() == SPOTIFY
        ));
    }

    #[tokio::test]
    async fn resolver_failure_surfaces_error() {
        let resolver = Arc::new(MockResolver { fail: true, ..Default::default() });
        let coordinator = coordinator(resolver, None);

        let outcome = coordinator.handle(Delivery::now(IntakeSource::DeepLink, SPOTIFY)).await;
        assert!(matches!(
            outcome,
            IntakeOutcome::Rejected { reason: RejectionReason::ResolutionUnavailable, .. }
        ));
    }

    /// Fails the first call, succeeds afterwards
    #[derive(Default)]
    struct FlakyResolver {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LinkResolver for FlakyResolver {
        async fn resolve(&self, url: &CanonicalUrl) -> Result<ResolvedLinks, ResolveError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(ResolveError::Status(503));
            }
            let mut links = HashMap::new();
            links.insert(Platform::Spotify, url.as_str().to_string());
            Ok(ResolvedLinks { links_by_platform: links, ..Default::default() })
        }
    }

    #[tokio::test]
    async fn retry_after_resolver_failure_is_not_suppressed() {
        let resolver = Arc::new(FlakyResolver::default());
        let coordinator = IntakeCoordinator::new(classifier(), DuplicateSuppressor::default(), resolver.clone(), None);
        let start = Instant::now();

        let first = coordinator.handle(deep_link(SPOTIFY, start)).await;
        assert!(matches!(
            first,
            IntakeOutcome::Rejected { reason: RejectionReason::ResolutionUnavailable, .. }
        ));
        assert!(coordinator.suppressor().last_delivery().is_none());

        let retry = coordinator.handle(deep_link(SPOTIFY, start + Duration::from_secs(1))).await;
        assert!(matches!(
            retry,
            IntakeOutcome::Dispatched { target: NavigationTarget::OpenInExternalApp { ref url, .. }, .. }
                if url.as_str() == SPOTIFY
        ));
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 2);

        // The successful retry is remembered again
        let replay = coordinator.handle(deep_link(SPOTIFY, start + Duration::from_secs(2))).await;
        assert!(matches!(replay, IntakeOutcome::Suppressed { .. }));
    }

    #[tokio::test]
    async fn duplicate_deliveries_dispatch_once_inside_window() {
        let coordinator = coordinator(Arc::new(MockResolver::default()), None);
        let start = Instant::now();

        let first = coordinator.handle(deep_link(SPOTIFY, start)).await;
        let second = coordinator.handle(deep_link(SPOTIFY, start + Duration::from_secs(1))).await;
        let later = coordinator.handle(deep_link(SPOTIFY, start + Duration::from_secs(4))).await;

        assert!(matches!(first, IntakeOutcome::Dispatched { .. }));
        assert!(matches!(second, IntakeOutcome::Suppressed { .. }));
        assert!(matches!(later, IntakeOutcome::Dispatched { .. }));
    }

    #[tokio::test]
    async fn share_requests_are_never_suppressed() {
        let resolver = Arc::new(MockResolver::default());
        let coordinator = coordinator(resolver.clone(), None);
        let start = Instant::now();
        let text = "Check this out https://open.spotify.com/track/abc?si=xyz";

        for offset in [0, 1] {
            let delivery = Delivery::new(IntakeSource::Clipboard, text, start + Duration::from_millis(offset));
            let outcome = coordinator.handle(delivery).await;
            match outcome {
                IntakeOutcome::Dispatched {
                    target: NavigationTarget::ShowSharingUi { url, share_url, metadata, .. },
                    ..
                } => {
                    assert_eq!(url.as_str(), "https://open.spotify.com/track/abc?si=xyz");
                    assert!(share_url.starts_with("https://unitune.art/s/"));
                    assert_eq!(metadata.unwrap().artist, "Artist");
                }
                other => panic!("Expected share sheet, got {other:?}"),
            }
        }
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn playlist_links_dispatch_directly() {
        let coordinator = coordinator(Arc::new(MockResolver::default()), None);
        let outcome = coordinator
            .handle(Delivery::now(IntakeSource::DeepLink, "https://unitune.art/p/abc123"))
            .await;
        assert_eq!(
            outcome,
            IntakeOutcome::Dispatched {
                intent: LinkIntent::ImportPlaylist { playlist_id: "abc123".into() },
                target: NavigationTarget::NavigateToPlaylistImport { playlist_id: "abc123".into() },
            }
        );
    }

    #[tokio::test]
    async fn clipboard_noise_is_ignored_but_share_intent_noise_is_reported() {
        let coordinator = coordinator(Arc::new(MockResolver::default()), None);

        let clipboard = coordinator.handle(Delivery::now(IntakeSource::Clipboard, "grocery list")).await;
        assert_eq!(clipboard, IntakeOutcome::Ignored { reason: RejectionReason::Malformed });

        let shared = coordinator
            .handle(Delivery::now(IntakeSource::ShareIntent, "see https://evil.example.com/x"))
            .await;
        assert!(matches!(
            shared,
            IntakeOutcome::Rejected {
                reason: RejectionReason::UntrustedHost,
                target: NavigationTarget::ShowError { retryable: false, .. },
            }
        ));
    }

    struct GatedResolver {
        gate: tokio::sync::Notify,
    }

    #[async_trait]
    impl LinkResolver for GatedResolver {
        async fn resolve(&self, _url: &CanonicalUrl) -> Result<ResolvedLinks, ResolveError> {
            self.gate.notified().await;
            Ok(ResolvedLinks::default())
        }
    }

    #[tokio::test]
    async fn replay_during_resolution_is_suppressed() {
        let resolver = Arc::new(GatedResolver { gate: tokio::sync::Notify::new() });
        let coordinator = Arc::new(IntakeCoordinator::new(
            classifier(),
            DuplicateSuppressor::default(),
            resolver.clone(),
            None,
        ));
        let start = Instant::now();

        let first = tokio::spawn({
            let coordinator = coordinator.clone();
            async move { coordinator.handle(deep_link(SPOTIFY, start)).await }
        });
        while coordinator.suppressor().last_delivery().is_none() {
            tokio::task::yield_now().await;
        }

        let second = coordinator.handle(deep_link(SPOTIFY, start + Duration::from_millis(500))).await;
        assert!(matches!(second, IntakeOutcome::Suppressed { .. }));

        resolver.gate.notify_one();
        let first = first.await.unwrap();
        assert!(matches!(first, IntakeOutcome::Dispatched { .. }));
    }
}

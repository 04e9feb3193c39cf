//! Shared application state
//!
//! Builds the intake pipeline once at startup and shares it across the
//! HTTP handlers.

use std::sync::Arc;

use crate::classifier::LinkClassifier;
use crate::codec::ShareCodec;
use crate::config::AppConfig;
use crate::coordinator::IntakeCoordinator;
use crate::resolver::LinkResolver;
use crate::suppressor::DuplicateSuppressor;
use crate::validator::Validator;

/// Application state shared across all request handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,

    /// Codec for issuing and opening share links
    pub codec: ShareCodec,

    /// Intake pipeline; holds the one live delivery record
    pub coordinator: Arc<IntakeCoordinator>,
}

/// Wires validator, codec, classifier, suppressor and resolver together.
///
/// # Example
///
/// ```no_run
/// # use std::sync::Arc;
/// # use unitune::config::AppConfig;
/// # use unitune::resolver::OdesliResolver;
/// # use unitune::state::init_state;
/// let config = AppConfig::default();
/// let resolver = OdesliResolver::new(&config.resolver_url, &config.user_country).unwrap();
/// let state = init_state(config, Arc::new(resolver));
/// ```
pub fn init_state(config: AppConfig, resolver: Arc<dyn LinkResolver>) -> AppState {
    let codec = ShareCodec::new(Validator::new(config.policy.clone()));
    let coordinator = IntakeCoordinator::new(
        LinkClassifier::new(codec.clone()),
        DuplicateSuppressor::new(config.replay_window),
        resolver,
        config.preferred_platform,
    );

    AppState {
        config: Arc::new(config),
        codec,
        coordinator: Arc::new(coordinator),
    }
}

//! Link intake and resolution engine
//!
//! Receives music links from deep links, share intents and the clipboard,
//! validates and classifies them, filters OS redeliveries, and issues and
//! opens compact share links. The binary serves the app's share domain.

pub mod classifier;
pub mod codec;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod handler;
pub mod middleware;
pub mod model;
pub mod platform;
pub mod resolver;
pub mod route;
pub mod state;
pub mod suppressor;
pub mod validator;

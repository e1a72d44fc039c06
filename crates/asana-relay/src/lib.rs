//! Asana webhook relay.
//!
//! This crate provides:
//! - REST client for the Asana API behind the [`TaskService`] trait
//! - Webhook payload parsing and the handshake header
//! - Rules that tag, classify and file tasks as events arrive
//! - Webhook subscription management (startup reconciliation, new projects)
//! - HTTP server for webhook handling (standalone service)

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)] // Many async API methods can fail

pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod lifecycle;
pub mod models;
pub mod rules;
pub mod server;

pub use client::{AsanaClient, TaskService};
pub use config::Config;
pub use error::{AsanaError, ConfigError};
pub use events::{Event, EventAction, ResourceType, WebhookPayload};
pub use lifecycle::{ReconcileReport, WebhookManager};
pub use rules::{Outcome, Rule, RuleSet};

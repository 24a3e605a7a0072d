//! Cal.com booking webhook sink.
//!
//! This crate relays booking lifecycle events from Cal.com webhooks into
//! Todoist, maintaining a durable `booking uid -> task id` mapping so that
//! later events (reschedule, cancel, payment, meeting start/end, no-show)
//! can locate and mutate the correct task.
//!
//! It provides:
//! - Webhook payload classification and signature verification
//! - An event dispatcher that reconciles booking state against Todoist
//! - A durable mapping store (file-backed, with an in-memory variant)
//! - A Todoist REST client
//! - An axum HTTP server exposing the webhook and health endpoints

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)] // Many async API methods can fail

pub mod config;
pub mod dispatch;
pub mod errors;
pub mod format;
pub mod models;
pub mod server;
pub mod store;
pub mod todoist;
pub mod webhooks;

pub use config::Config;
pub use dispatch::Dispatcher;
pub use errors::{SinkError, SinkResult};
pub use models::{
    BookingPayload, EventPayload, NoShowPayload, Person, TriggerEvent, VideoNoShowPayload,
    WebhookEnvelope,
};
pub use store::{FileStore, MappingStore, MemoryStore, TaskMapping};
pub use todoist::{TaskClient, TodoistClient};
pub use webhooks::verify_webhook_signature;

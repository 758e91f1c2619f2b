//! LEXVOYAGE API Library
//!
//! Server side of the LEXVOYAGE travel site: the quote-request intake
//! pipeline plus thin pass-throughs to the hosted auth and storage services.
//!
//! # Modules
//!
//! - `api`: API definitions.
//! - `domain`: Core business logic.
//! - `integrations`: External service integrations.
//! - `auth`: Magic-link auth gateway and observable sessions.
//! - `config`: Configuration management.
//! - `document_store`: Per-user document vault gateway.
//! - `errors`: Error handling types.
//! - `handlers`: HTTP request handlers and shared state.
//! - `intake`: Lead validation, normalization, persistence and notification.
//! - `models`: Request/response data models.
//! - `notifier`: Sales-inbox notification providers.
//! - `routes`: Router and OpenAPI document.
//! - `sink`: Lead row-store gateway.
//! - `vault_handler`: Itinerary vault handlers.

pub mod api;
pub mod domain;
pub mod integrations;

pub mod auth;
pub mod config;
pub mod document_store;
pub mod errors;
pub mod handlers;
pub mod intake;
pub mod models;
pub mod notifier;
pub mod routes;
pub mod sink;
pub mod vault_handler;

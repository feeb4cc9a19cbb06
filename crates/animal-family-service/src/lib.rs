//! Animal Family HTTP API Service.
//!
//! This crate provides the HTTP API behind the Animal Family Telegram
//! mini-app:
//!
//! - Sessions and profiles
//! - Listing submission, feeds and moderation
//! - Business-connection requests
//! - Pet passports and site settings
//! - The premium veterinary advice chat
//!
//! # Authentication
//!
//! Callers present the mini-app's signed init data as
//! `Authorization: tma <initData>`. The signature is checked against the bot
//! token; a verified user is upserted into a local account. Requests without
//! valid init data are served as guests.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Allow some pedantic lints that are noisy for Axum handler functions
#![allow(clippy::missing_errors_doc)] // Axum handlers all return Result
#![allow(clippy::unused_async)] // Handlers are async for the router

pub mod advice;
pub mod auth;
pub mod config;
pub mod crypto;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod init_data;
pub mod routes;
pub mod state;
pub mod workflows;

pub use advice::{AdviceClient, AdviceError};
pub use auth::Caller;
pub use config::ServiceConfig;
pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;

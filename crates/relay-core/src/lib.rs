//! Core domain + application logic for the number relay bot.
//!
//! This crate is framework-agnostic. Telegram lives behind the
//! [`messaging::port::MessagingPort`] trait, implemented in `relay-telegram`.

pub mod broadcast;
pub mod commands;
pub mod config;
pub mod domain;
pub mod errors;
pub mod logging;
pub mod messaging;
pub mod numbers;
pub mod store;
pub mod utils;

pub use errors::{Error, Result};

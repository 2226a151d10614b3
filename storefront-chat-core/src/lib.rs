//! Core types and traits for storefront-chat
//!
//! This crate provides configuration loading, logging setup, the
//! conversation data model and the session stores shared by the other
//! storefront-chat components.

pub mod config;
pub mod error;
pub mod logging;
pub mod session;
pub mod utils;

pub use error::{Error, Result};

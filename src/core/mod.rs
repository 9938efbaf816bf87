//! Core module
//!
//! This module provides the application-wide foundations:
//! - Configuration management
//! - Structured logging system
//! - Error handling and type system
//! - Text, ISBN and language normalization helpers

pub mod config;
pub mod error;
pub mod isbn;
pub mod language;
pub mod logging;
pub mod text;

pub use config::Config;
pub use error::{BookshelfError, ErrorContext, ErrorResponse, Result};
pub use logging::Logger;

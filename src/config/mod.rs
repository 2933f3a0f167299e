//! Configuration management for the versus-rank service
//!
//! This module handles configuration loading from environment variables or a
//! TOML file, validation, and default values for the ranking core.

pub mod app;
pub mod matchmaking;
pub mod normalization;
pub mod rating;

// Re-export commonly used types
pub use app::{validate_config, AppConfig, ServiceSettings};
pub use matchmaking::MatchmakingConfig;
pub use normalization::NormalizationConfig;
pub use rating::RatingConfig;

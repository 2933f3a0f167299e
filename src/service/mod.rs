//! Service layer for the versus-rank service
//!
//! This module contains the main application state and the background
//! normalization task.

pub mod app;

pub use app::{AppState, ServiceError};

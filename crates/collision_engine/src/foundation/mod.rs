//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the engine:
//! - Math types for 2D world space
//! - Logging bootstrap

pub mod math;
pub mod logging;

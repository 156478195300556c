//! Core types, configuration, resolution logic and the pipeline surface.

pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod resolution;

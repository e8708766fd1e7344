//! Data models for RIB extraction.

pub mod config;
pub mod document;
pub mod record;

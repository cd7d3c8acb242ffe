//! Data models for invoice extraction.

pub mod config;
pub mod invoice;

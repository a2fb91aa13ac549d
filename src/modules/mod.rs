//! Modules layer - Infrastructure components for external integrations
//!
//! Clients and adapters for the geocoding APIs and the image store.

pub mod geocoding;
pub mod storage;

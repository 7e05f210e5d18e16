// src/lib.rs
//! NMEA Publisher Library
//!
//! Encodes boat navigation state as NMEA-0183 sentences and publishes them
//! over UDP for chartplotter and autopilot software.

pub mod config;
pub mod error;
pub mod nav;
pub mod publisher;

// Re-export main types for convenience
pub use config::{ErrorPolicy, PublisherConfig};
pub use error::{PublisherError, Result};
pub use nav::{BoatdClient, NavigationSnapshot, NavigationSource};
pub use publisher::TelemetryPublisher;

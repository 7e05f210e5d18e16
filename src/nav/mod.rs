// src/nav/mod.rs
//! Navigation data, its NMEA-0183 encoding and the boat service that supplies it

pub mod boatd;
pub mod data;
pub mod nmea;

pub use boatd::{BoatdClient, NavigationSource};
pub use data::{NavigationSnapshot, SentenceKind, SpeedUnit, WindReading, WindReference};

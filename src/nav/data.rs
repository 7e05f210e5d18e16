// src/nav/data.rs
//! Navigation value types

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use super::nmea;

/// Reference frame of a wind reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WindReference {
    /// Apparent wind, measured relative to the moving vessel
    Relative,
    /// Absolute wind, ground referenced
    #[default]
    True,
}

impl WindReference {
    /// Single-letter MWV reference code
    pub fn code(&self) -> char {
        match self {
            WindReference::Relative => 'R',
            WindReference::True => 'T',
        }
    }
}

/// Unit of a wind speed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SpeedUnit {
    #[serde(rename = "N")]
    Knots,
    #[serde(rename = "K")]
    KilometersPerHour,
    #[default]
    #[serde(rename = "M")]
    MetersPerSecond,
}

impl SpeedUnit {
    /// Single-letter MWV unit code
    pub fn code(&self) -> char {
        match self {
            SpeedUnit::Knots => 'N',
            SpeedUnit::KilometersPerHour => 'K',
            SpeedUnit::MetersPerSecond => 'M',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindReading {
    pub angle: f64,  // degrees
    pub speed: f64,
    pub reference: WindReference,
    pub unit: SpeedUnit,
}

impl WindReading {
    pub fn apparent(angle: f64, speed: f64, unit: SpeedUnit) -> Self {
        Self { angle, speed, reference: WindReference::Relative, unit }
    }

    pub fn absolute(angle: f64, speed: f64, unit: SpeedUnit) -> Self {
        Self { angle, speed, reference: WindReference::True, unit }
    }

    /// Encode as an MWV sentence
    pub fn to_mwv(&self) -> String {
        nmea::mwv(self.angle, self.speed, self.unit, self.reference)
    }
}

/// Which sentence to emit for a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentenceKind {
    Hdm,
    Gga,
    Gll,
    MwvTrue,
    MwvApparent,
    Rsa,
}

impl SentenceKind {
    /// Every output, in transmission order
    pub const ALL: [SentenceKind; 6] = [
        SentenceKind::Hdm,
        SentenceKind::Gga,
        SentenceKind::Gll,
        SentenceKind::MwvTrue,
        SentenceKind::MwvApparent,
        SentenceKind::Rsa,
    ];
}

/// State of the boat at one instant.
///
/// Built fresh for every publishing cycle and handed to the encoder by value;
/// nothing in the encoder keeps or mutates it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NavigationSnapshot {
    pub latitude: f64,   // decimal degrees, positive north
    pub longitude: f64,  // decimal degrees, positive east
    pub heading: f64,    // magnetic, degrees
    pub apparent_wind: WindReading,
    pub absolute_wind: WindReading,
    pub rudder_angle: f64,  // degrees, starboard positive
    pub timestamp: NaiveTime,  // UTC
}

impl NavigationSnapshot {
    /// Encode a single sentence of the given kind
    pub fn sentence(&self, kind: SentenceKind) -> String {
        match kind {
            SentenceKind::Hdm => nmea::hdm(self.heading),
            SentenceKind::Gga => nmea::gga(self.latitude, self.longitude, self.timestamp),
            SentenceKind::Gll => nmea::gll(self.latitude, self.longitude, self.timestamp),
            SentenceKind::MwvTrue => self.absolute_wind.to_mwv(),
            SentenceKind::MwvApparent => self.apparent_wind.to_mwv(),
            SentenceKind::Rsa => nmea::rsa(self.rudder_angle),
        }
    }

    /// Encode the given kinds in order
    pub fn sentences(&self, kinds: &[SentenceKind]) -> Vec<String> {
        kinds.iter().map(|&kind| self.sentence(kind)).collect()
    }
}

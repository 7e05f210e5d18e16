// src/nav/nmea.rs
//! NMEA-0183 sentence encoding
//!
//! Every function here is pure: navigation values in, sentence text out.
//! Sentences are returned without a line terminator.

use std::fmt;

use chrono::{NaiveTime, Timelike};

use super::data::{SpeedUnit, WindReference};

/// Significant digits used for headings, wind angles and rudder angles
const SIGNIFICANT_DIGITS: i32 = 3;

/// Fix quality, satellites, HDOP, altitude and geoid fields of GGA, followed
/// by the empty DGPS age and station fields
const GGA_FIX_FIELDS: &str = "1,12,.5,0,M,0,M,,";

/// A sentence body, rendered on the wire as `$<body>*<checksum>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sentence {
    body: String,
}

impl Sentence {
    pub fn new(body: impl Into<String>) -> Self {
        Self { body: body.into() }
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn checksum(&self) -> String {
        checksum(&self.body)
    }
}

impl fmt::Display for Sentence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}*{}", self.body, self.checksum())
    }
}

/// XOR of every byte in the body as two uppercase hex digits
pub fn checksum(body: &str) -> String {
    let sum = body.bytes().fold(0u8, |acc, b| acc ^ b);
    format!("{:02X}", sum)
}

/// Wrap a body with the start delimiter and checksum
pub fn sentence(body: &str) -> String {
    Sentence::new(body).to_string()
}

/// Render an absolute decimal-degree value as degrees followed directly by
/// minutes with four decimals, e.g. `51.5` -> `5130.0000`.
///
/// The degree part is truncated, so `0.999999` stays at zero degrees.
/// Negative input is not supported; pass `value.abs()` and encode the sign
/// with [`latitude_hemisphere`] or [`longitude_hemisphere`].
pub fn format_coordinate(value: f64) -> String {
    let degrees = value.trunc();
    let minutes = (value - degrees) * 60.0;
    format!("{}{:.4}", degrees as i64, minutes)
}

pub fn latitude_hemisphere(latitude: f64) -> char {
    if latitude >= 0.0 { 'N' } else { 'S' }
}

pub fn longitude_hemisphere(longitude: f64) -> char {
    if longitude >= 0.0 { 'E' } else { 'W' }
}

/// `hhmmss.cc`, with the hundredths truncated from the sub-second part
pub fn format_time(time: NaiveTime) -> String {
    // Leap seconds carry nanosecond values past one second
    let centis = (time.nanosecond() % 1_000_000_000) / 10_000_000;
    format!(
        "{:02}{:02}{:02}.{:02}",
        time.hour(),
        time.minute(),
        time.second(),
        centis
    )
}

/// Format with three significant digits, the way C's `%.3g` does.
///
/// Values whose decimal exponent lies in `-4..3` are written in fixed
/// notation, everything else as `d.dde±XX`. Trailing zeros are dropped in
/// both forms: `90.0` -> `90`, `0.012345` -> `0.0123`, `1234.0` -> `1.23e+03`.
pub fn format_significant(value: f64) -> String {
    if let Some(text) = non_finite(value) {
        return text;
    }
    if value == 0.0 {
        return if value.is_sign_negative() { "-0" } else { "0" }.to_string();
    }

    // The exponent has to come from the already rounded mantissa: 999.5 is 1.00e3
    let scientific = format!("{:.*e}", (SIGNIFICANT_DIGITS - 1) as usize, value);
    let (mantissa, exponent) = match scientific.split_once('e') {
        Some(parts) => parts,
        None => return scientific,
    };
    let exponent: i32 = exponent.parse().unwrap_or(0);

    if (-4..SIGNIFICANT_DIGITS).contains(&exponent) {
        let decimals = (SIGNIFICANT_DIGITS - 1 - exponent) as usize;
        trim_fraction(&format!("{:.*}", decimals, value)).to_string()
    } else {
        format!("{}{}", trim_fraction(mantissa), exponent_suffix(exponent))
    }
}

/// Shortest decimal that reads back as the same value, keeping at least one
/// fractional digit: `5.0` -> `5.0`, `3.25` -> `3.25`, `1e16` -> `1e+16`.
pub fn format_speed(value: f64) -> String {
    if let Some(text) = non_finite(value) {
        return text;
    }

    let shortest = format!("{:?}", value);
    match shortest.split_once('e') {
        Some((mantissa, exponent)) => {
            let exponent: i32 = exponent.parse().unwrap_or(0);
            format!("{}{}", mantissa, exponent_suffix(exponent))
        }
        None => shortest,
    }
}

fn non_finite(value: f64) -> Option<String> {
    if value.is_nan() {
        Some("nan".to_string())
    } else if value.is_infinite() {
        Some(if value > 0.0 { "inf" } else { "-inf" }.to_string())
    } else {
        None
    }
}

fn trim_fraction(text: &str) -> &str {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.')
    } else {
        text
    }
}

fn exponent_suffix(exponent: i32) -> String {
    let sign = if exponent < 0 { '-' } else { '+' };
    format!("e{}{:02}", sign, exponent.abs())
}

fn position_fields(latitude: f64, longitude: f64) -> String {
    format!(
        "{},{},{},{}",
        format_coordinate(latitude.abs()),
        latitude_hemisphere(latitude),
        format_coordinate(longitude.abs()),
        longitude_hemisphere(longitude)
    )
}

/// HDM: magnetic heading
pub fn hdm(heading: f64) -> String {
    sentence(&format!("GPHDM,{},M", format_significant(heading)))
}

/// GGA: fix data. Only time and position are live; the quality fields are fixed.
pub fn gga(latitude: f64, longitude: f64, time: NaiveTime) -> String {
    sentence(&format!(
        "GPGGA,{},{},{}",
        format_time(time),
        position_fields(latitude, longitude),
        GGA_FIX_FIELDS
    ))
}

/// GLL: geographic position, always flagged valid
pub fn gll(latitude: f64, longitude: f64, time: NaiveTime) -> String {
    sentence(&format!(
        "GPGLL,{},{},A",
        position_fields(latitude, longitude),
        format_time(time)
    ))
}

/// MWV: wind angle and speed in the given reference frame
pub fn mwv(angle: f64, speed: f64, unit: SpeedUnit, reference: WindReference) -> String {
    sentence(&format!(
        "MWV,{},{},{},{},A",
        format_significant(angle),
        reference.code(),
        format_speed(speed),
        unit.code()
    ))
}

/// RSA: starboard rudder angle. The port rudder is not sensed.
pub fn rsa(angle: f64) -> String {
    sentence(&format!("RSA,{},A,0.0,X", format_significant(angle)))
}

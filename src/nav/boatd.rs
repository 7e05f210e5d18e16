// src/nav/boatd.rs
//! Boat-control service client
//!
//! The wire protocol is this crate's own, not a published standard: the
//! service speaks newline-delimited JSON over TCP. Every `?STATE;` request
//! is answered with one `STATE` object; other message classes (e.g. the
//! `VERSION` banner sent on connect) may be interleaved. A boat service with
//! a different API sits behind [`NavigationSource`] instead.

use super::data::{NavigationSnapshot, SpeedUnit, WindReading};
use crate::error::{PublisherError, Result};
use chrono::{NaiveTime, Utc};
use log::{debug, info};
use serde::Deserialize;
use std::{collections::HashMap, future::Future, time::Duration};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::TcpStream,
    time::timeout,
};

const STATE_REQUEST: &[u8] = b"?STATE;\n";

pub const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_secs(2);

/// Anything that can produce a fresh navigation snapshot on demand
pub trait NavigationSource {
    fn fetch(&mut self) -> impl Future<Output = Result<NavigationSnapshot>> + Send;
}

#[derive(Debug, Deserialize)]
struct BoatdMessage {
    class: String,
    #[serde(flatten)]
    data: HashMap<String, serde_json::Value>,
}

pub struct BoatdClient {
    reader: BufReader<TcpStream>,
    wind_unit: SpeedUnit,
    reply_timeout: Duration,
    line: String,
}

impl BoatdClient {
    /// Connect to the boat-control service. Wind speeds it reports are
    /// tagged with `wind_unit`.
    pub async fn connect(host: &str, port: u16, wind_unit: SpeedUnit) -> Result<Self> {
        let stream = TcpStream::connect(format!("{}:{}", host, port))
            .await
            .map_err(|e| PublisherError::Connection(format!("Failed to connect to boat service at {}:{}: {}", host, port, e)))?;

        info!("Connected to boat service at {}:{}", host, port);

        Ok(Self {
            reader: BufReader::new(stream),
            wind_unit,
            reply_timeout: DEFAULT_REPLY_TIMEOUT,
            line: String::new(),
        })
    }

    /// Give up on a request that has no `STATE` answer after `reply_timeout`
    pub fn with_reply_timeout(mut self, reply_timeout: Duration) -> Self {
        self.reply_timeout = reply_timeout;
        self
    }

    async fn request_state(&mut self) -> Result<NavigationSnapshot> {
        let limit = self.reply_timeout;
        match timeout(limit, self.exchange()).await {
            Ok(result) => result,
            Err(_) => Err(PublisherError::Connection(format!("Boat service did not reply within {:?}", limit))),
        }
    }

    async fn exchange(&mut self) -> Result<NavigationSnapshot> {
        self.reader
            .get_mut()
            .write_all(STATE_REQUEST)
            .await
            .map_err(|e| PublisherError::Connection(format!("Failed to send state request: {}", e)))?;

        loop {
            self.line.clear();
            let read = self.reader.read_line(&mut self.line).await?;
            if read == 0 {
                return Err(PublisherError::Connection("Boat service closed the connection".to_string()));
            }

            let line = self.line.trim();
            if line.is_empty() {
                continue;
            }

            if let Some(snapshot) = parse_boatd_json(line, self.wind_unit, Utc::now().time())? {
                return Ok(snapshot);
            }
        }
    }
}

impl NavigationSource for BoatdClient {
    fn fetch(&mut self) -> impl Future<Output = Result<NavigationSnapshot>> + Send {
        self.request_state()
    }
}

/// Parse one line from the boat service.
///
/// Returns `Ok(None)` for messages that carry no navigation state.
pub fn parse_boatd_json(line: &str, wind_unit: SpeedUnit, timestamp: NaiveTime) -> Result<Option<NavigationSnapshot>> {
    let msg: BoatdMessage = serde_json::from_str(line)
        .map_err(|e| PublisherError::Parse(format!("Failed to parse boat service JSON: {}", e)))?;

    match msg.class.as_str() {
        "STATE" => parse_state_message(&msg.data, wind_unit, timestamp).map(Some),
        "VERSION" => {
            parse_version_message(&msg.data);
            Ok(None)
        }
        other => {
            debug!("Ignoring boat service message of class {}", other);
            Ok(None)
        }
    }
}

fn parse_state_message(
    msg_data: &HashMap<String, serde_json::Value>,
    wind_unit: SpeedUnit,
    timestamp: NaiveTime,
) -> Result<NavigationSnapshot> {
    let apparent = wind_field(msg_data, "apparent_wind")?;
    let absolute = wind_field(msg_data, "absolute_wind")?;

    Ok(NavigationSnapshot {
        latitude: number_field(msg_data, "lat")?,
        longitude: number_field(msg_data, "lon")?,
        heading: number_field(msg_data, "heading")?,
        apparent_wind: WindReading::apparent(apparent.0, apparent.1, wind_unit),
        absolute_wind: WindReading::absolute(absolute.0, absolute.1, wind_unit),
        rudder_angle: number_field(msg_data, "rudder")?,
        timestamp,
    })
}

fn number_field(msg_data: &HashMap<String, serde_json::Value>, key: &str) -> Result<f64> {
    msg_data
        .get(key)
        .and_then(|v| v.as_f64())
        .ok_or_else(|| PublisherError::Parse(format!("STATE message has no numeric '{}'", key)))
}

/// (angle, speed) of a wind object
fn wind_field(msg_data: &HashMap<String, serde_json::Value>, key: &str) -> Result<(f64, f64)> {
    let wind = msg_data
        .get(key)
        .and_then(|v| v.as_object())
        .ok_or_else(|| PublisherError::Parse(format!("STATE message has no '{}' object", key)))?;

    let angle = wind.get("angle").and_then(|v| v.as_f64());
    let speed = wind.get("speed").and_then(|v| v.as_f64());
    match (angle, speed) {
        (Some(angle), Some(speed)) => Ok((angle, speed)),
        _ => Err(PublisherError::Parse(format!("'{}' needs numeric angle and speed", key))),
    }
}

fn parse_version_message(msg_data: &HashMap<String, serde_json::Value>) {
    if let Some(version) = msg_data.get("release").and_then(|v| v.as_str()) {
        info!("Boat service version: {}", version);
    }
}

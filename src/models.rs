//! Data models.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::FleetError;

/// Vessel identifier
///
/// Every tracked vessel is identified by the id of the operator account
/// that owns it. Ids are opaque, non-empty strings assigned by the backend
/// (or locally in demo mode).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VesselId(String);

impl TryFrom<String> for VesselId {
    type Error = FleetError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(FleetError::InvalidVesselId(value));
        }
        Ok(Self(trimmed.to_string()))
    }
}

impl TryFrom<&str> for VesselId {
    type Error = FleetError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::try_from(value.to_string())
    }
}

impl From<VesselId> for String {
    fn from(id: VesselId) -> Self {
        id.0
    }
}

impl fmt::Display for VesselId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl VesselId {
    /// Wrap an id known to be non-empty
    pub(crate) fn from_trusted(value: &str) -> Self {
        debug_assert!(!value.trim().is_empty());
        Self(value.to_string())
    }

    /// Get the raw id value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Fisherman,
    Organization,
    Admin,
}

/// Operator account; a fisherman account is one tracked vessel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: VesselId,
    /// Operator name
    pub name: String,
    /// Vessel display name, None for accounts without a craft
    #[serde(default)]
    pub vessel_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    pub role: Role,
}

impl User {
    /// Name shown for this vessel on maps and in history
    pub fn display_name(&self) -> &str {
        self.vessel_name.as_deref().unwrap_or(&self.name)
    }
}

/// Request to create an account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub name: String,
    pub vessel_name: Option<String>,
    pub email: Option<String>,
    pub role: Role,
}

impl NewUser {
    pub fn into_user(self, id: VesselId) -> User {
        User {
            id,
            name: self.name,
            vessel_name: self.vessel_name,
            email: self.email,
            role: self.role,
        }
    }
}

/// WGS84 coordinate pair in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Flat-earth distance in kilometres, accurate over a few tens of km
    pub fn distance_km(&self, other: &Coordinate) -> f64 {
        let dy = (self.lat - other.lat) * KM_PER_DEGREE;
        let dx = (self.lon - other.lon) * KM_PER_DEGREE * other.lat.to_radians().cos();
        (dx * dx + dy * dy).sqrt()
    }
}

/// Kilometres per degree of latitude
pub const KM_PER_DEGREE: f64 = 111.0;

/// One position fix of one vessel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationSample {
    pub vessel_id: VesselId,
    pub lat: f64,
    pub lon: f64,
    /// Speed over ground in knots
    pub speed: f64,
    /// Heading in degrees, [0, 360)
    pub heading: f64,
    pub timestamp: DateTime<Utc>,
}

impl LocationSample {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lon)
    }
}

/// Position reading submitted by a caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionReport {
    pub vessel_id: VesselId,
    pub lat: f64,
    pub lon: f64,
    pub speed: f64,
    pub heading: f64,
    /// Defaults to the time of recording
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl PositionReport {
    pub fn into_sample(self, now: DateTime<Utc>) -> LocationSample {
        LocationSample {
            vessel_id: self.vessel_id,
            lat: self.lat,
            lon: self.lon,
            speed: self.speed,
            heading: self.heading,
            timestamp: self.timestamp.unwrap_or(now),
        }
    }
}

impl From<LocationSample> for PositionReport {
    fn from(sample: LocationSample) -> Self {
        Self {
            vessel_id: sample.vessel_id,
            lat: sample.lat,
            lon: sample.lon,
            speed: sample.speed,
            heading: sample.heading,
            timestamp: Some(sample.timestamp),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    Emergency,
    ZoneViolation,
    Weather,
    System,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::Emergency => "emergency",
            AlertKind::ZoneViolation => "zone_violation",
            AlertKind::Weather => "weather",
            AlertKind::System => "system",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// Alert lifecycle
///
/// Progresses active -> acknowledged -> resolved and never regresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Active,
    Acknowledged,
    Resolved,
}

impl AlertStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertStatus::Active => "active",
            AlertStatus::Acknowledged => "acknowledged",
            AlertStatus::Resolved => "resolved",
        }
    }

    /// Move to `next`, staying put when already there.
    pub fn advance_to(self, next: AlertStatus) -> Result<AlertStatus, FleetError> {
        if next < self {
            return Err(FleetError::InvalidStatusTransition {
                from: self.as_str().to_string(),
                to: next.as_str().to_string(),
            });
        }
        Ok(next)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: String,
    pub user_id: VesselId,
    #[serde(rename = "type")]
    pub kind: AlertKind,
    pub message: String,
    #[serde(default)]
    pub location: Option<Coordinate>,
    pub severity: Severity,
    pub status: AlertStatus,
    pub created_at: DateTime<Utc>,
}

/// Request to raise an alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAlert {
    pub user_id: VesselId,
    #[serde(rename = "type")]
    pub kind: AlertKind,
    pub message: String,
    pub location: Option<Coordinate>,
    pub severity: Severity,
}

impl NewAlert {
    /// New alerts always start active
    pub fn into_alert(self, id: String, created_at: DateTime<Utc>) -> Alert {
        Alert {
            id,
            user_id: self.user_id,
            kind: self.kind,
            message: self.message,
            location: self.location,
            severity: self.severity,
            status: AlertStatus::Active,
            created_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    Broadcast,
    System,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub sender_id: String,
    #[serde(default)]
    pub receiver_id: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub is_read: bool,
}

/// Request to send a message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMessage {
    pub sender_id: String,
    pub receiver_id: Option<String>,
    pub channel: Option<String>,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: MessageKind,
}

impl NewMessage {
    /// New messages always start unread
    pub fn into_message(self, id: String, timestamp: DateTime<Utc>) -> Message {
        Message {
            id,
            sender_id: self.sender_id,
            receiver_id: self.receiver_id,
            channel: self.channel,
            content: self.content,
            kind: self.kind,
            timestamp,
            is_read: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoneKind {
    Safety,
    Fishing,
    Restricted,
    Navigation,
}

/// Named polygon area
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Zone {
    pub id: String,
    pub name: String,
    /// Closed ring, first vertex repeated last
    pub polygon: Vec<Coordinate>,
    #[serde(rename = "type")]
    pub kind: ZoneKind,
    pub active: bool,
}

/// Request to create a zone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewZone {
    pub name: String,
    pub polygon: Vec<Coordinate>,
    #[serde(rename = "type")]
    pub kind: ZoneKind,
    pub active: bool,
}

impl NewZone {
    pub fn into_zone(self, id: String) -> Zone {
        Zone {
            id,
            name: self.name,
            polygon: close_ring(self.polygon),
            kind: self.kind,
            active: self.active,
        }
    }
}

/// Repeat the first vertex at the end unless the ring is already closed
pub fn close_ring(mut polygon: Vec<Coordinate>) -> Vec<Coordinate> {
    if let (Some(first), Some(last)) = (polygon.first().copied(), polygon.last()) {
        if polygon.len() > 1 && first != *last {
            polygon.push(first);
        }
    }
    polygon
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TripStatus {
    Active,
    Completed,
    Cancelled,
}

impl TripStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TripStatus::Active => "active",
            TripStatus::Completed => "completed",
            TripStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    pub id: String,
    pub vessel_id: VesselId,
    pub start_time: DateTime<Utc>,
    /// None while the trip is still open
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    pub start_location: Coordinate,
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub captain: Option<String>,
    /// Distance covered in kilometres
    pub distance: f64,
    pub max_speed: f64,
    pub avg_speed: f64,
    pub status: TripStatus,
}

impl Trip {
    pub fn is_open(&self) -> bool {
        self.end_time.is_none()
    }
}

/// Tracker device fitted to a vessel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub vessel_id: Option<VesselId>,
    /// Battery level in percent
    #[serde(default)]
    pub battery_level: Option<u8>,
    #[serde(default)]
    pub last_seen: Option<DateTime<Utc>>,
    pub active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeatherCondition {
    Clear,
    PartlyCloudy,
    Windy,
    RoughSea,
}

impl WeatherCondition {
    pub fn icon(&self) -> &'static str {
        match self {
            WeatherCondition::Clear => "sun",
            WeatherCondition::PartlyCloudy => "cloud-sun",
            WeatherCondition::Windy => "wind",
            WeatherCondition::RoughSea => "waves",
        }
    }
}

/// Where a weather reading came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeatherSource {
    Provider,
    Synthetic,
}

/// Current weather and sea state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherReading {
    pub temperature_c: f64,
    pub wind_speed_knots: f64,
    /// Direction the wind blows from, degrees
    pub wind_direction_deg: f64,
    pub wave_height_m: f64,
    pub visibility_km: f64,
    pub pressure_hpa: f64,
    /// Relative humidity in percent
    pub humidity_pct: f64,
    pub condition: WeatherCondition,
    pub icon: String,
    pub timestamp: DateTime<Utc>,
    pub source: WeatherSource,
}

/// Fleet-wide counts, derived on demand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FleetStats {
    /// Distinct vessels with a sample in the retained window
    pub active_vessels: usize,
    pub active_alerts: usize,
    pub total_records: usize,
}

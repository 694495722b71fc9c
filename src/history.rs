//! Unified history timeline
//!
//! Trips, alerts, messages and location samples merged into one list that
//! can be filtered, searched and exported.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};

use crate::aggregator::FleetSnapshot;
use crate::models::{Alert, LocationSample, Message, Trip, VesselId};

/// Date format used in exports
const EXPORT_DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryKind {
    Trips,
    Alerts,
    Messages,
    Locations,
}

impl HistoryKind {
    pub fn label(&self) -> &'static str {
        match self {
            HistoryKind::Trips => "trip",
            HistoryKind::Alerts => "alert",
            HistoryKind::Messages => "message",
            HistoryKind::Locations => "location",
        }
    }
}

/// One timeline entry
#[derive(Debug, Clone, PartialEq)]
pub enum HistoryItem {
    Trip(Trip),
    Alert(Alert),
    Message(Message),
    Location {
        sample: LocationSample,
        vessel_name: String,
    },
}

impl HistoryItem {
    pub fn kind(&self) -> HistoryKind {
        match self {
            HistoryItem::Trip(_) => HistoryKind::Trips,
            HistoryItem::Alert(_) => HistoryKind::Alerts,
            HistoryItem::Message(_) => HistoryKind::Messages,
            HistoryItem::Location { .. } => HistoryKind::Locations,
        }
    }

    /// Time the entry is sorted and filtered by
    pub fn display_date(&self) -> DateTime<Utc> {
        match self {
            HistoryItem::Trip(trip) => trip.start_time,
            HistoryItem::Alert(alert) => alert.created_at,
            HistoryItem::Message(message) => message.timestamp,
            HistoryItem::Location { sample, .. } => sample.timestamp,
        }
    }

    pub fn status_label(&self) -> &'static str {
        match self {
            HistoryItem::Trip(trip) => trip.status.as_str(),
            HistoryItem::Alert(alert) => alert.status.as_str(),
            HistoryItem::Message(message) if message.is_read => "read",
            HistoryItem::Message(_) => "unread",
            HistoryItem::Location { .. } => "",
        }
    }

    /// Single descriptive field used in exports
    pub fn details(&self) -> String {
        match self {
            HistoryItem::Trip(trip) => format!(
                "{} ({:.1} km{})",
                trip.destination.as_deref().unwrap_or("-"),
                trip.distance,
                if trip.is_open() { ", in progress" } else { "" }
            ),
            HistoryItem::Alert(alert) => alert.message.clone(),
            HistoryItem::Message(message) => message.content.clone(),
            HistoryItem::Location {
                sample,
                vessel_name,
            } => format!(
                "{}: {:.5}, {:.5} at {:.1} kn",
                vessel_name, sample.lat, sample.lon, sample.speed
            ),
        }
    }

    /// Messages have no status of their own: "completed" selects read ones,
    /// anything else unread ones. Locations always pass.
    fn matches_status(&self, status: &str) -> bool {
        match self {
            HistoryItem::Trip(trip) => trip.status.as_str() == status,
            HistoryItem::Alert(alert) => alert.status.as_str() == status,
            HistoryItem::Message(message) => message.is_read == (status == "completed"),
            HistoryItem::Location { .. } => true,
        }
    }

    /// `needle` must already be lowercase
    fn matches_search(&self, needle: &str) -> bool {
        let contains = |haystack: &str| haystack.to_lowercase().contains(needle);
        match self {
            HistoryItem::Trip(trip) => {
                trip.destination.as_deref().is_some_and(contains)
                    || trip.captain.as_deref().is_some_and(contains)
            }
            HistoryItem::Alert(alert) => contains(&alert.message) || contains(alert.kind.as_str()),
            HistoryItem::Message(message) => {
                contains(&message.content) || contains(&message.sender_id)
            }
            HistoryItem::Location { vessel_name, .. } => contains(vessel_name),
        }
    }
}

/// Filter stages; None passes everything through
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryFilter {
    pub kind: Option<HistoryKind>,
    /// Inclusive lower bound on the display date
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on the display date
    pub to: Option<DateTime<Utc>>,
    pub status: Option<String>,
    pub search: Option<String>,
}

impl HistoryFilter {
    fn accepts(&self, item: &HistoryItem, needle: Option<&str>) -> bool {
        if self.kind.is_some_and(|kind| kind != item.kind()) {
            return false;
        }
        let date = item.display_date();
        if self.from.is_some_and(|from| date < from) || self.to.is_some_and(|to| date > to) {
            return false;
        }
        if let Some(status) = self.status.as_deref() {
            if !item.matches_status(status) {
                return false;
            }
        }
        needle.map_or(true, |needle| item.matches_search(needle))
    }
}

/// Outcome of a history query
#[derive(Debug, Clone, PartialEq)]
pub enum HistoryResult {
    /// Nothing has been loaded yet
    NotLoaded,
    /// Data is loaded but no item passed the filter
    Empty,
    Items(Vec<HistoryItem>),
}

impl HistoryResult {
    pub fn items(&self) -> &[HistoryItem] {
        match self {
            HistoryResult::Items(items) => items,
            HistoryResult::NotLoaded | HistoryResult::Empty => &[],
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct HistoryView {
    items: Option<Vec<HistoryItem>>,
}

impl HistoryView {
    /// Merge the four collections, trips first, then alerts, messages and
    /// locations. Location samples are labelled with the vessel's display
    /// name when known.
    pub fn new(
        trips: &[Trip],
        alerts: &[Alert],
        messages: &[Message],
        locations: &[LocationSample],
        vessel_names: &BTreeMap<VesselId, String>,
    ) -> Self {
        let mut items = Vec::with_capacity(trips.len() + alerts.len() + messages.len() + locations.len());
        items.extend(trips.iter().cloned().map(HistoryItem::Trip));
        items.extend(alerts.iter().cloned().map(HistoryItem::Alert));
        items.extend(messages.iter().cloned().map(HistoryItem::Message));
        items.extend(locations.iter().map(|sample| HistoryItem::Location {
            vessel_name: vessel_names
                .get(&sample.vessel_id)
                .cloned()
                .unwrap_or_else(|| sample.vessel_id.to_string()),
            sample: sample.clone(),
        }));

        Self { items: Some(items) }
    }

    /// View over a snapshot; not loaded until the first refresh finished
    pub fn from_snapshot(snapshot: &FleetSnapshot) -> Self {
        if snapshot.last_refresh.is_none() {
            return Self::default();
        }
        let locations: Vec<LocationSample> = snapshot.locations.iter().cloned().collect();
        Self::new(
            &snapshot.trips,
            &snapshot.alerts,
            &snapshot.messages,
            &locations,
            &snapshot.vessel_names(),
        )
    }

    pub fn is_loaded(&self) -> bool {
        self.items.is_some()
    }

    /// Apply the filter pipeline, newest first
    pub fn query(&self, filter: &HistoryFilter) -> HistoryResult {
        let Some(items) = &self.items else {
            return HistoryResult::NotLoaded;
        };

        let needle = filter
            .search
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);

        let mut matched: Vec<HistoryItem> = items
            .iter()
            .filter(|item| filter.accepts(item, needle.as_deref()))
            .cloned()
            .collect();
        matched.sort_by_key(|item| std::cmp::Reverse(item.display_date()));

        if matched.is_empty() {
            HistoryResult::Empty
        } else {
            HistoryResult::Items(matched)
        }
    }
}

/// Flat export record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRow {
    pub kind: String,
    pub date: String,
    pub status: String,
    pub details: String,
}

impl From<&HistoryItem> for ExportRow {
    fn from(item: &HistoryItem) -> Self {
        Self {
            kind: item.kind().label().to_string(),
            date: item.display_date().format(EXPORT_DATE_FORMAT).to_string(),
            status: item.status_label().to_string(),
            details: item.details(),
        }
    }
}

/// Export rows in display order
pub fn export_rows(items: &[HistoryItem]) -> Vec<ExportRow> {
    items.iter().map(ExportRow::from).collect()
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Comma-separated rendering with a header line
pub fn to_csv(rows: &[ExportRow]) -> String {
    let mut out = String::from("type,date,status,details\n");
    for row in rows {
        let fields = [&row.kind, &row.date, &row.status, &row.details];
        let line: Vec<String> = fields.iter().map(|f| csv_field(f)).collect();
        out.push_str(&line.join(","));
        out.push('\n');
    }
    out
}

pub fn export_filename(date: NaiveDate) -> String {
    format!("fleet_history_{}.csv", date.format("%Y-%m-%d"))
}

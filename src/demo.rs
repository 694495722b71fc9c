//! Demo roster and seed data for local mode

use chrono::{DateTime, Duration, Utc};

use crate::models::{
    close_ring, Coordinate, Device, Role, Trip, TripStatus, User, VesselId, Zone, ZoneKind,
};

/// (id, operator, vessel name)
const DEMO_FISHERMEN: [(&str, &str, &str); 5] = [
    ("pirogue-1", "Moussa Diop", "Ndeye Fatou"),
    ("pirogue-2", "Ibrahima Sarr", "Baye Fall"),
    ("pirogue-3", "Cheikh Ndiaye", "Sopi"),
    ("pirogue-4", "Abdou Faye", "Teranga"),
    ("pirogue-5", "Ousmane Gueye", "Yaye Boye"),
];

fn vessel_id(raw: &str) -> VesselId {
    VesselId::from_trusted(raw)
}

/// Vessels the simulator tracks in demo mode
pub fn roster() -> Vec<VesselId> {
    DEMO_FISHERMEN.iter().map(|(id, _, _)| vessel_id(id)).collect()
}

pub fn users() -> Vec<User> {
    let mut users: Vec<User> = DEMO_FISHERMEN
        .iter()
        .map(|(id, name, vessel)| User {
            id: vessel_id(id),
            name: name.to_string(),
            vessel_name: Some(vessel.to_string()),
            email: Some(format!("{}@demo.local", id)),
            role: Role::Fisherman,
        })
        .collect();

    users.push(User {
        id: vessel_id("org-1"),
        name: "Union des pêcheurs de Soumbédioune".to_string(),
        vessel_name: None,
        email: Some("union@demo.local".to_string()),
        role: Role::Organization,
    });
    users.push(User {
        id: vessel_id("admin-1"),
        name: "Administrateur".to_string(),
        vessel_name: None,
        email: Some("admin@demo.local".to_string()),
        role: Role::Admin,
    });
    users
}

fn square(center: Coordinate, half_side_deg: f64) -> Vec<Coordinate> {
    close_ring(vec![
        Coordinate::new(center.lat - half_side_deg, center.lon - half_side_deg),
        Coordinate::new(center.lat - half_side_deg, center.lon + half_side_deg),
        Coordinate::new(center.lat + half_side_deg, center.lon + half_side_deg),
        Coordinate::new(center.lat + half_side_deg, center.lon - half_side_deg),
    ])
}

/// Zones laid out around the simulator's reference center
pub fn zones(center: Coordinate) -> Vec<Zone> {
    vec![
        Zone {
            id: "zone-safety".to_string(),
            name: "Zone de sécurité côtière".to_string(),
            polygon: square(center, 0.045),
            kind: ZoneKind::Safety,
            active: true,
        },
        Zone {
            id: "zone-fishing".to_string(),
            name: "Zone de pêche artisanale".to_string(),
            polygon: square(Coordinate::new(center.lat + 0.02, center.lon - 0.03), 0.015),
            kind: ZoneKind::Fishing,
            active: true,
        },
        Zone {
            id: "zone-restricted".to_string(),
            name: "Aire marine protégée".to_string(),
            polygon: square(Coordinate::new(center.lat - 0.03, center.lon + 0.02), 0.01),
            kind: ZoneKind::Restricted,
            active: true,
        },
        Zone {
            id: "zone-navigation".to_string(),
            name: "Chenal d'accès au port".to_string(),
            polygon: square(Coordinate::new(center.lat, center.lon + 0.035), 0.005),
            kind: ZoneKind::Navigation,
            active: false,
        },
    ]
}

/// One finished trip from yesterday and one open trip per fisherman
pub fn trips(center: Coordinate, now: DateTime<Utc>) -> Vec<Trip> {
    DEMO_FISHERMEN
        .iter()
        .enumerate()
        .flat_map(|(i, (id, name, _))| {
            let offset = i as i64;
            let yesterday = now - Duration::hours(24 + offset);
            vec![
                Trip {
                    id: format!("trip-{}-1", id),
                    vessel_id: vessel_id(id),
                    start_time: yesterday,
                    end_time: Some(yesterday + Duration::hours(9)),
                    start_location: center,
                    destination: Some("Kayar".to_string()),
                    captain: Some(name.to_string()),
                    distance: 32.0 + offset as f64,
                    max_speed: 14.0,
                    avg_speed: 7.5,
                    status: TripStatus::Completed,
                },
                Trip {
                    id: format!("trip-{}-2", id),
                    vessel_id: vessel_id(id),
                    start_time: now - Duration::hours(3) - Duration::minutes(offset * 10),
                    end_time: None,
                    start_location: center,
                    destination: Some("Fosse de Kayar".to_string()),
                    captain: Some(name.to_string()),
                    distance: 8.0,
                    max_speed: 12.0,
                    avg_speed: 6.0,
                    status: TripStatus::Active,
                },
            ]
        })
        .collect()
}

pub fn devices(now: DateTime<Utc>) -> Vec<Device> {
    DEMO_FISHERMEN
        .iter()
        .enumerate()
        .map(|(i, (id, _, vessel))| Device {
            id: format!("tracker-{}", i + 1),
            name: format!("Balise {}", vessel),
            vessel_id: Some(vessel_id(id)),
            battery_level: Some(95 - (i as u8) * 12),
            last_seen: Some(now),
            active: true,
        })
        .collect()
}

/// Editable local copies of the categories that have no event log
///
/// Seeded from the demo data; local-mode CRUD edits land here so that the
/// next local refresh does not undo them.
#[derive(Debug, Clone)]
pub struct DemoStore {
    pub users: Vec<User>,
    pub zones: Vec<Zone>,
    pub trips: Vec<Trip>,
    pub devices: Vec<Device>,
}

impl DemoStore {
    pub fn seeded(center: Coordinate, now: DateTime<Utc>) -> Self {
        Self {
            users: users(),
            zones: zones(center),
            trips: trips(center, now),
            devices: devices(now),
        }
    }

    pub fn trips_for(&self, user_id: &VesselId) -> Vec<Trip> {
        self.trips
            .iter()
            .filter(|trip| &trip.vessel_id == user_id)
            .cloned()
            .collect()
    }
}

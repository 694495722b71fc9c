use std::collections::BTreeMap;

use chrono::{DateTime, Duration, TimeZone, Utc};

use fleet_tracker::{
    history::{export_rows, to_csv, HistoryFilter, HistoryItem, HistoryKind, HistoryResult, HistoryView},
    models::{
        AlertKind, Coordinate, LocationSample, MessageKind, NewAlert, NewMessage, Severity, Trip,
        TripStatus, VesselId,
    },
};

fn base() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 6, 0, 0).unwrap()
}

fn vessel(id: &str) -> VesselId {
    VesselId::try_from(id).unwrap()
}

fn fixture() -> HistoryView {
    let at = |minutes: i64| base() + Duration::minutes(minutes);

    let trips: Vec<Trip> = (0..3)
        .map(|i| Trip {
            id: format!("t{}", i),
            vessel_id: vessel("pirogue-1"),
            start_time: at(i * 10),
            end_time: None,
            start_location: Coordinate::new(14.69, -17.44),
            destination: Some("Kayar".to_string()),
            captain: Some("Moussa Diop".to_string()),
            distance: 12.0,
            max_speed: 10.0,
            avg_speed: 6.0,
            status: if i == 0 {
                TripStatus::Completed
            } else {
                TripStatus::Active
            },
        })
        .collect();

    let alerts = vec![
        NewAlert {
            user_id: vessel("pirogue-2"),
            kind: AlertKind::Emergency,
            message: "Urgence: voie d'eau".to_string(),
            location: None,
            severity: Severity::Critical,
        }
        .into_alert("a1".to_string(), at(1)),
        NewAlert {
            user_id: vessel("pirogue-3"),
            kind: AlertKind::Weather,
            message: "Houle de 3 m".to_string(),
            location: None,
            severity: Severity::Medium,
        }
        .into_alert("a2".to_string(), at(11)),
    ];

    let messages: Vec<_> = (0..4)
        .map(|i| {
            let mut message = NewMessage {
                sender_id: "org-1".to_string(),
                receiver_id: None,
                channel: Some("general".to_string()),
                content: format!("Bulletin {}", i),
                kind: MessageKind::Broadcast,
            }
            .into_message(format!("m{}", i), at(i * 10 + 2));
            message.is_read = i % 2 == 0;
            message
        })
        .collect();

    let locations: Vec<LocationSample> = (0..5)
        .map(|i| LocationSample {
            vessel_id: vessel("pirogue-4"),
            lat: 14.7,
            lon: -17.45,
            speed: 7.0,
            heading: 270.0,
            timestamp: at(i * 10 + 3),
        })
        .collect();

    let names = BTreeMap::from([(vessel("pirogue-4"), "Teranga".to_string())]);
    HistoryView::new(&trips, &alerts, &messages, &locations, &names)
}

#[test]
fn no_filter_returns_everything_newest_first() {
    let result = fixture().query(&HistoryFilter::default());
    let items = result.items();

    assert_eq!(items.len(), 3 + 2 + 4 + 5);
    assert!(items
        .windows(2)
        .all(|pair| pair[0].display_date() > pair[1].display_date()));
}

#[test]
fn type_filter_selects_one_category() {
    let view = fixture();
    let alerts = view.query(&HistoryFilter {
        kind: Some(HistoryKind::Alerts),
        ..Default::default()
    });

    assert_eq!(alerts.items().len(), 2);
    assert!(alerts
        .items()
        .iter()
        .all(|item| matches!(item, HistoryItem::Alert(_))));
}

#[test]
fn date_range_is_inclusive() {
    let view = fixture();
    let filter = HistoryFilter {
        from: Some(base() + Duration::minutes(10)),
        to: Some(base() + Duration::minutes(12)),
        ..Default::default()
    };

    let ids: Vec<String> = view
        .query(&filter)
        .items()
        .iter()
        .map(|item| match item {
            HistoryItem::Trip(t) => t.id.clone(),
            HistoryItem::Alert(a) => a.id.clone(),
            HistoryItem::Message(m) => m.id.clone(),
            HistoryItem::Location { .. } => "location".to_string(),
        })
        .collect();

    assert_eq!(ids, vec!["m1", "a2", "t1"]);
}

#[test]
fn range_excluding_everything_is_empty() {
    let filter = HistoryFilter {
        from: Some(base() + Duration::days(1)),
        ..Default::default()
    };

    assert_eq!(fixture().query(&filter), HistoryResult::Empty);
}

#[test]
fn status_filter_per_category() {
    let view = fixture();
    let completed = view.query(&HistoryFilter {
        status: Some("completed".to_string()),
        ..Default::default()
    });

    // one completed trip, two read messages, every location
    assert_eq!(completed.items().len(), 1 + 2 + 5);
    assert!(completed.items().iter().all(|item| match item {
        HistoryItem::Trip(t) => t.status == TripStatus::Completed,
        HistoryItem::Message(m) => m.is_read,
        HistoryItem::Alert(_) => false,
        HistoryItem::Location { .. } => true,
    }));
}

#[test]
fn search_ignores_case() {
    let view = fixture();
    let search = |term: &str| {
        view.query(&HistoryFilter {
            search: Some(term.to_string()),
            ..Default::default()
        })
    };

    assert_eq!(search("URGENCE").items().len(), 1);
    assert_eq!(search("urgence").items().len(), 1);
    assert_eq!(search("WEATHER").items().len(), 1);
    assert_eq!(search("teranga").items().len(), 5);
    assert_eq!(search("moussa").items().len(), 3);
    assert_eq!(search("ORG-1").items().len(), 4);
    assert_eq!(search("introuvable"), HistoryResult::Empty);
}

#[test]
fn export_follows_display_order() {
    let view = fixture();
    let result = view.query(&HistoryFilter {
        kind: Some(HistoryKind::Locations),
        ..Default::default()
    });
    let rows = export_rows(result.items());

    assert_eq!(rows.len(), 5);
    assert_eq!(rows[0].kind, "location");
    assert_eq!(rows[0].date, "2024-06-01 06:43");
    assert!(rows[0].details.starts_with("Teranga: "));

    let csv = to_csv(&rows);
    assert_eq!(csv.lines().count(), 6);
    assert!(csv.starts_with("type,date,status,details\n"));
}

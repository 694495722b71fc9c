#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use tempfile::TempDir;

use fleet_tracker::{
    aggregator::{FleetDataAggregator, FleetDataAggregatorBuilder},
    backend::FleetBackend,
    credentials::TokenStore,
    errors::FleetError,
    models::{
        Alert, AlertStatus, Device, LocationSample, Message, NewAlert, NewMessage, NewUser,
        NewZone, PositionReport, Trip, User, VesselId, Zone,
    },
};

#[derive(Default)]
struct FakeState {
    users: Vec<User>,
    locations: Vec<LocationSample>,
    alerts: Vec<Alert>,
    messages: Vec<Message>,
    zones: Vec<Zone>,
}

/// Scripted in-memory backend
#[derive(Default)]
pub struct FakeBackend {
    /// Probe fails
    pub offline: AtomicBool,
    /// Alert listing fails
    pub fail_alerts: AtomicBool,
    /// Every create/update/ack call fails
    pub fail_writes: AtomicBool,
    /// User and zone CRUD is rejected with a validation message
    pub reject_crud: AtomicBool,
    pub location_posts: AtomicUsize,
    next_id: AtomicUsize,
    state: Mutex<FakeState>,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set(flag: &AtomicBool, value: bool) {
        flag.store(value, Ordering::SeqCst);
    }

    pub fn seed_alert(&self, alert: Alert) {
        self.state.lock().unwrap().alerts.push(alert);
    }

    pub fn zone_count(&self) -> usize {
        self.state.lock().unwrap().zones.len()
    }

    fn id(&self, prefix: &str) -> String {
        format!("srv-{}-{}", prefix, self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    fn write(&self) -> Result<(), FleetError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(FleetError::BackendUnavailable("forced failure".to_string()));
        }
        Ok(())
    }

    fn crud(&self) -> Result<(), FleetError> {
        self.write()?;
        if self.reject_crud.load(Ordering::SeqCst) {
            return Err(FleetError::Rejected {
                message: "Email already in use".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl FleetBackend for FakeBackend {
    async fn probe(&self) -> Result<(), FleetError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(FleetError::BackendUnavailable("offline".to_string()));
        }
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<User>, FleetError> {
        Ok(self.state.lock().unwrap().users.clone())
    }

    async fn create_user(&self, user: &NewUser) -> Result<User, FleetError> {
        self.crud()?;
        let user = user
            .clone()
            .into_user(VesselId::try_from(self.id("user")).unwrap());
        self.state.lock().unwrap().users.push(user.clone());
        Ok(user)
    }

    async fn update_user(&self, user: &User) -> Result<User, FleetError> {
        self.crud()?;
        Ok(user.clone())
    }

    async fn delete_user(&self, _id: &VesselId) -> Result<(), FleetError> {
        self.crud()
    }

    async fn list_locations(&self) -> Result<Vec<LocationSample>, FleetError> {
        Ok(self.state.lock().unwrap().locations.clone())
    }

    async fn create_location(&self, report: &PositionReport) -> Result<LocationSample, FleetError> {
        self.write()?;
        self.location_posts.fetch_add(1, Ordering::SeqCst);
        Ok(report.clone().into_sample(Utc::now()))
    }

    async fn list_alerts(&self) -> Result<Vec<Alert>, FleetError> {
        if self.fail_alerts.load(Ordering::SeqCst) {
            return Err(FleetError::BackendStatus {
                status: 502,
                body: "bad gateway".to_string(),
            });
        }
        Ok(self.state.lock().unwrap().alerts.clone())
    }

    async fn create_alert(&self, alert: &NewAlert) -> Result<Alert, FleetError> {
        self.write()?;
        let alert = alert.clone().into_alert(self.id("alert"), Utc::now());
        self.state.lock().unwrap().alerts.push(alert.clone());
        Ok(alert)
    }

    async fn acknowledge_alert(&self, id: &str) -> Result<(), FleetError> {
        self.write()?;
        if let Some(alert) = self.state.lock().unwrap().alerts.iter_mut().find(|a| a.id == id) {
            alert.status = AlertStatus::Acknowledged;
        }
        Ok(())
    }

    async fn resolve_alert(&self, id: &str) -> Result<(), FleetError> {
        self.write()?;
        if let Some(alert) = self.state.lock().unwrap().alerts.iter_mut().find(|a| a.id == id) {
            alert.status = AlertStatus::Resolved;
        }
        Ok(())
    }

    async fn list_messages(&self) -> Result<Vec<Message>, FleetError> {
        Ok(self.state.lock().unwrap().messages.clone())
    }

    async fn send_message(&self, message: &NewMessage) -> Result<Message, FleetError> {
        self.write()?;
        let message = message.clone().into_message(self.id("msg"), Utc::now());
        self.state.lock().unwrap().messages.push(message.clone());
        Ok(message)
    }

    async fn mark_message_read(&self, id: &str) -> Result<(), FleetError> {
        self.write()?;
        if let Some(m) = self.state.lock().unwrap().messages.iter_mut().find(|m| m.id == id) {
            m.is_read = true;
        }
        Ok(())
    }

    async fn list_zones(&self) -> Result<Vec<Zone>, FleetError> {
        Ok(self.state.lock().unwrap().zones.clone())
    }

    async fn create_zone(&self, zone: &NewZone) -> Result<Zone, FleetError> {
        self.crud()?;
        let zone = zone.clone().into_zone(self.id("zone"));
        self.state.lock().unwrap().zones.push(zone.clone());
        Ok(zone)
    }

    async fn update_zone(&self, zone: &Zone) -> Result<Zone, FleetError> {
        self.crud()?;
        Ok(zone.clone())
    }

    async fn delete_zone(&self, id: &str) -> Result<(), FleetError> {
        self.crud()?;
        self.state.lock().unwrap().zones.retain(|z| z.id != id);
        Ok(())
    }

    async fn list_trips(&self, _user_id: &VesselId) -> Result<Vec<Trip>, FleetError> {
        Ok(Vec::new())
    }

    async fn list_devices(&self) -> Result<Vec<Device>, FleetError> {
        Ok(Vec::new())
    }
}

/// Token store holding a token, kept alive by the returned directory
pub fn stored_token() -> (TempDir, TokenStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = TokenStore::new(dir.path().join("token"));
    store.save("test-token").unwrap();
    (dir, store)
}

/// Aggregator wired to `backend` with a stored credential
pub fn remote_aggregator(backend: Arc<FakeBackend>) -> (TempDir, FleetDataAggregator) {
    let (dir, store) = stored_token();
    let aggregator = FleetDataAggregatorBuilder::new()
        .backend(backend)
        .credentials(store)
        .build()
        .unwrap();
    (dir, aggregator)
}

pub fn local_aggregator() -> FleetDataAggregator {
    FleetDataAggregatorBuilder::new().build().unwrap()
}

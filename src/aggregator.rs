//! Fleet data aggregation
//!
//! [`FleetDataAggregator`] owns the in-memory [`FleetSnapshot`] the UI reads.
//! Each refresh cycle first decides a [`DataSourceMode`] and then loads every
//! volatile category from the backend or from local data. Mutations land in
//! local state first and are forwarded to the backend on a best-effort basis.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    backend::FleetBackend,
    config::SimulatorConfig,
    credentials::TokenStore,
    demo::{self, DemoStore},
    errors::FleetError,
    event_log::{local_id, EventLog},
    history::HistoryView,
    models::{
        Alert, AlertStatus, Device, FleetStats, LocationSample, Message, NewAlert, NewMessage,
        NewUser, NewZone, PositionReport, Role, Trip, User, VesselId, WeatherReading, Zone,
    },
    simulator::TelemetrySimulator,
    weather::{WeatherService, WeatherSynthesizer},
};

/// Number of location samples kept for the whole fleet
pub const LOCATION_WINDOW: usize = 100;

/// Where one refresh cycle sources its data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataSourceMode {
    /// Backend reachable with a valid credential
    Remote,
    /// Simulator, event log and demo data
    #[default]
    Local,
}

/// The aggregator's current view of the fleet
#[derive(Debug, Clone, Default)]
pub struct FleetSnapshot {
    pub mode: DataSourceMode,
    pub users: Vec<User>,
    /// Latest sample per vessel
    pub latest: BTreeMap<VesselId, LocationSample>,
    /// Recent samples across the fleet, newest first
    pub locations: VecDeque<LocationSample>,
    /// Newest first
    pub alerts: Vec<Alert>,
    /// Newest first
    pub messages: Vec<Message>,
    pub zones: Vec<Zone>,
    pub trips: Vec<Trip>,
    pub devices: Vec<Device>,
    pub weather: Option<WeatherReading>,
    pub last_refresh: Option<DateTime<Utc>>,
}

impl FleetSnapshot {
    fn push_location(&mut self, sample: LocationSample, window: usize) {
        let newer = self
            .latest
            .get(&sample.vessel_id)
            .map_or(true, |current| current.timestamp <= sample.timestamp);
        if newer {
            self.latest.insert(sample.vessel_id.clone(), sample.clone());
        }
        self.locations.push_front(sample);
        self.locations.truncate(window);
    }

    fn replace_locations(&mut self, mut samples: Vec<LocationSample>, window: usize) {
        samples.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        samples.truncate(window);
        self.latest.clear();
        for sample in &samples {
            self.latest
                .entry(sample.vessel_id.clone())
                .or_insert_with(|| sample.clone());
        }
        self.locations = samples.into();
    }

    /// Derived counts over the current snapshot
    pub fn stats(&self) -> FleetStats {
        let active_vessels = self
            .locations
            .iter()
            .map(|sample| &sample.vessel_id)
            .collect::<BTreeSet<_>>()
            .len();
        let active_alerts = self
            .alerts
            .iter()
            .filter(|alert| alert.status == AlertStatus::Active)
            .count();
        let total_records = self.users.len()
            + self.locations.len()
            + self.alerts.len()
            + self.messages.len()
            + self.zones.len()
            + self.trips.len()
            + self.devices.len();

        FleetStats {
            active_vessels,
            active_alerts,
            total_records,
        }
    }

    /// Vessel id to display name, for every known account
    pub fn vessel_names(&self) -> BTreeMap<VesselId, String> {
        self.users
            .iter()
            .map(|user| (user.id.clone(), user.display_name().to_string()))
            .collect()
    }
}

/// Newest first, with local-only items the backend has not seen kept in
fn merge_pending<T: Clone>(
    mut remote: Vec<T>,
    local: Vec<T>,
    id: impl Fn(&T) -> &str,
    time: impl Fn(&T) -> DateTime<Utc>,
) -> Vec<T> {
    let pending: Vec<T> = local
        .into_iter()
        .filter(|item| id(item).starts_with("local-"))
        .filter(|item| !remote.iter().any(|r| id(r) == id(item)))
        .collect();
    remote.extend(pending);
    remote.sort_by_key(|item| std::cmp::Reverse(time(item)));
    remote
}

pub struct FleetDataAggregator {
    backend: Option<Arc<dyn FleetBackend>>,
    credentials: Option<TokenStore>,
    simulator: Arc<Mutex<TelemetrySimulator>>,
    weather: WeatherService,
    log: Mutex<EventLog>,
    store: Mutex<DemoStore>,
    snapshot: RwLock<FleetSnapshot>,
    location_window: usize,
}

impl FleetDataAggregator {
    /// Decide the source mode for the next cycle
    ///
    /// Remote needs a backend, a stored credential (when a token store is
    /// configured) and a successful probe.
    pub async fn probe_connectivity(&self) -> DataSourceMode {
        let Some(backend) = &self.backend else {
            debug!("No backend configured, using local data");
            return DataSourceMode::Local;
        };

        if let Some(credentials) = &self.credentials {
            match credentials.load() {
                Ok(Some(_)) => {}
                Ok(None) => {
                    info!("No backend credential stored, using local data");
                    return DataSourceMode::Local;
                }
                Err(e) => {
                    warn!("Could not read backend credential, using local data: {}", e);
                    return DataSourceMode::Local;
                }
            }
        }

        match backend.probe().await {
            Ok(()) => DataSourceMode::Remote,
            Err(e) => {
                warn!("Backend probe failed, using local data: {}", e);
                DataSourceMode::Local
            }
        }
    }

    /// Mode decided by the latest cycle
    pub async fn mode(&self) -> DataSourceMode {
        self.snapshot.read().await.mode
    }

    fn remote(&self, mode: DataSourceMode) -> Option<&dyn FleetBackend> {
        match mode {
            DataSourceMode::Remote => self.backend.as_deref(),
            DataSourceMode::Local => None,
        }
    }

    /// Run a backend read, None when local or when the read failed
    async fn fetch_remote<'a, T, R, RFut>(
        &'a self,
        category: &str,
        mode: DataSourceMode,
        remote: R,
    ) -> Option<T>
    where
        R: FnOnce(&'a dyn FleetBackend) -> RFut,
        RFut: Future<Output = Result<T, FleetError>>,
    {
        let backend = self.remote(mode)?;
        match remote(backend).await {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Fetching {} from backend failed, using local data: {}", category, e);
                None
            }
        }
    }

    /// Remote write first, `local` when in local mode or the write failed
    async fn dual_write<'a, T, R, RFut, L, LFut>(
        &'a self,
        action: &str,
        mode: DataSourceMode,
        remote: R,
        local: L,
    ) -> T
    where
        R: FnOnce(&'a dyn FleetBackend) -> RFut,
        RFut: Future<Output = Result<T, FleetError>>,
        L: FnOnce() -> LFut,
        LFut: Future<Output = T>,
    {
        match self.remote(mode) {
            Some(backend) => match remote(backend).await {
                Ok(value) => return value,
                Err(e) => warn!("{} failed on backend, kept locally: {}", action, e),
            },
            None => debug!("{} applied locally", action),
        }
        local().await
    }

    /// First load of every category, identity data included
    pub async fn initial_load(&self) -> DataSourceMode {
        let mode = self.probe_connectivity().await;
        info!("Initial load: mode={:?}", mode);

        let users = self.fetch_users(mode).await;
        self.snapshot.write().await.users = users.clone();
        self.refresh(mode).await;

        let mut trips = Vec::new();
        for user in users.iter().filter(|u| u.role == Role::Fisherman) {
            trips.extend(self.fetch_trips(mode, &user.id).await);
        }
        self.snapshot.write().await.trips = trips;

        mode
    }

    /// Probe, then refresh the volatile categories
    pub async fn refresh_cycle(&self) -> DataSourceMode {
        let mode = self.probe_connectivity().await;
        self.refresh(mode).await;
        mode
    }

    /// Reload locations, alerts, messages, zones, devices and weather
    ///
    /// Users and trips are identity data and only reload on request or when
    /// the source mode changes.
    pub async fn refresh(&self, mode: DataSourceMode) {
        let now = Utc::now();
        let center = self.simulator.lock().await.center();
        let switched = self.snapshot.read().await.mode != mode;
        let users = if switched {
            Some(self.fetch_users(mode).await)
        } else {
            None
        };

        let (locations, alerts, messages, zones, devices, weather) = tokio::join!(
            self.fetch_remote("locations", mode, |b| b.list_locations()),
            self.fetch_alerts(mode),
            self.fetch_messages(mode),
            self.fetch_zones(mode),
            self.fetch_devices(mode),
            self.weather.current(center, now),
        );
        let simulated = match &locations {
            Some(_) => Vec::new(),
            None => self.simulator.lock().await.current_positions(),
        };

        let mut snapshot = self.snapshot.write().await;
        if snapshot.mode != mode {
            info!("Data source switched from {:?} to {:?}", snapshot.mode, mode);
            snapshot.locations.clear();
            snapshot.latest.clear();
        }
        snapshot.mode = mode;
        if let Some(users) = users {
            snapshot.users = users;
        }

        match locations {
            Some(samples) => snapshot.replace_locations(samples, self.location_window),
            None => {
                for sample in simulated {
                    snapshot.latest.insert(sample.vessel_id.clone(), sample);
                }
            }
        }
        snapshot.alerts = alerts;
        snapshot.messages = messages;
        snapshot.zones = zones;
        snapshot.devices = devices;
        snapshot.weather = Some(weather);
        snapshot.last_refresh = Some(now);

        let last_local = self.log.lock().await.last_activity();
        debug!(
            "Refreshed snapshot: mode={:?}, alerts={}, messages={}, zones={}, last local activity={:?}",
            mode,
            snapshot.alerts.len(),
            snapshot.messages.len(),
            snapshot.zones.len(),
            last_local
        );
    }

    async fn fetch_users(&self, mode: DataSourceMode) -> Vec<User> {
        match self.fetch_remote("users", mode, |b| b.list_users()).await {
            Some(users) => users,
            None => self.store.lock().await.users.clone(),
        }
    }

    async fn fetch_trips(&self, mode: DataSourceMode, user_id: &VesselId) -> Vec<Trip> {
        match self
            .fetch_remote("trips", mode, |b| b.list_trips(user_id))
            .await
        {
            Some(trips) => trips,
            None => self.store.lock().await.trips_for(user_id),
        }
    }

    async fn fetch_alerts(&self, mode: DataSourceMode) -> Vec<Alert> {
        let remote = self.fetch_remote("alerts", mode, |b| b.list_alerts()).await;
        let log = self.log.lock().await;
        match remote {
            Some(mut alerts) => {
                // status changes the backend missed still apply
                log.apply_alert_statuses(&mut alerts);
                merge_pending(alerts, log.alerts(), |a| &a.id, |a| a.created_at)
            }
            None => log.alerts(),
        }
    }

    async fn fetch_messages(&self, mode: DataSourceMode) -> Vec<Message> {
        let remote = self.fetch_remote("messages", mode, |b| b.list_messages()).await;
        let log = self.log.lock().await;
        match remote {
            Some(mut messages) => {
                log.apply_read_marks(&mut messages);
                merge_pending(messages, log.messages(), |m| &m.id, |m| m.timestamp)
            }
            None => log.messages(),
        }
    }

    async fn fetch_zones(&self, mode: DataSourceMode) -> Vec<Zone> {
        match self.fetch_remote("zones", mode, |b| b.list_zones()).await {
            Some(zones) => zones,
            None => self.store.lock().await.zones.clone(),
        }
    }

    async fn fetch_devices(&self, mode: DataSourceMode) -> Vec<Device> {
        match self.fetch_remote("devices", mode, |b| b.list_devices()).await {
            Some(devices) => devices,
            None => self.store.lock().await.devices.clone(),
        }
    }

    /// Re-fetch identity data, skipped by the periodic refresh
    pub async fn load_users(&self) -> Vec<User> {
        let mode = self.mode().await;
        let users = self.fetch_users(mode).await;
        self.snapshot.write().await.users = users.clone();
        users
    }

    /// Load the trips of one account into the snapshot
    pub async fn load_trips(&self, user_id: &VesselId) -> Vec<Trip> {
        let mode = self.mode().await;
        let trips = self.fetch_trips(mode, user_id).await;

        let mut snapshot = self.snapshot.write().await;
        snapshot.trips.retain(|trip| &trip.vessel_id != user_id);
        snapshot.trips.extend(trips.iter().cloned());
        trips
    }

    /// Record a position reading
    ///
    /// Forwarded to the backend in the background when remote; always kept
    /// in the local window.
    pub async fn record_position(&self, report: PositionReport) -> LocationSample {
        let sample = report.clone().into_sample(Utc::now());

        if let (DataSourceMode::Remote, Some(backend)) = (self.mode().await, &self.backend) {
            let backend = backend.clone();
            tokio::spawn(async move {
                if let Err(e) = backend.create_location(&report).await {
                    warn!("Forwarding position of {} failed: {}", report.vessel_id, e);
                }
            });
        }

        self.snapshot
            .write()
            .await
            .push_location(sample.clone(), self.location_window);
        sample
    }

    /// Send a message; it shows up unread immediately
    pub async fn send_message(&self, message: NewMessage) -> Message {
        let mode = self.mode().await;
        let now = Utc::now();
        let log = &self.log;
        let pending = message.clone();

        let mut sent = self
            .dual_write(
                "Sending message",
                mode,
                |b| b.send_message(&message),
                move || async move { log.lock().await.append_message(pending, now) },
            )
            .await;
        sent.is_read = false;
        if !sent.id.starts_with("local-") {
            self.log.lock().await.record_message(sent.clone());
        }

        self.snapshot.write().await.messages.insert(0, sent.clone());
        sent
    }

    /// Raise an alert; it starts active at the head of the list
    pub async fn create_alert(&self, alert: NewAlert) -> Alert {
        let mode = self.mode().await;
        let now = Utc::now();
        let log = &self.log;
        let pending = alert.clone();

        let mut created = self
            .dual_write(
                "Creating alert",
                mode,
                |b| b.create_alert(&alert),
                move || async move { log.lock().await.append_alert(pending, now) },
            )
            .await;
        created.status = AlertStatus::Active;
        if !created.id.starts_with("local-") {
            self.log.lock().await.record_alert(created.clone());
        }

        info!(
            "Alert {} raised for {}: {}",
            created.id,
            created.user_id,
            created.kind.as_str()
        );
        self.snapshot.write().await.alerts.insert(0, created.clone());
        created
    }

    /// Mark an alert acknowledged; unknown ids are ignored
    pub async fn acknowledge_alert(&self, id: &str) -> Option<Alert> {
        let mode = self.mode().await;
        self.dual_write(
            "Acknowledging alert",
            mode,
            |b| b.acknowledge_alert(id),
            || async {},
        )
        .await;
        self.advance_alert(id, AlertStatus::Acknowledged).await
    }

    /// Mark an alert resolved; unknown ids are ignored
    pub async fn resolve_alert(&self, id: &str) -> Option<Alert> {
        let mode = self.mode().await;
        self.dual_write(
            "Resolving alert",
            mode,
            |b| b.resolve_alert(id),
            || async {},
        )
        .await;
        self.advance_alert(id, AlertStatus::Resolved).await
    }

    async fn advance_alert(&self, id: &str, status: AlertStatus) -> Option<Alert> {
        let now = Utc::now();
        let updated = {
            let mut snapshot = self.snapshot.write().await;
            let alert = snapshot.alerts.iter_mut().find(|alert| alert.id == id)?;
            match alert.status.advance_to(status) {
                Ok(next) => alert.status = next,
                Err(e) => debug!("Alert {} left unchanged: {}", id, e),
            }
            alert.clone()
        };
        self.log.lock().await.record_alert_status(id, updated.status, now);
        Some(updated)
    }

    /// Mark a message read; unknown ids are ignored
    pub async fn mark_message_read(&self, id: &str) -> Option<Message> {
        let mode = self.mode().await;
        self.dual_write(
            "Marking message read",
            mode,
            |b| b.mark_message_read(id),
            || async {},
        )
        .await;

        let updated = {
            let mut snapshot = self.snapshot.write().await;
            let message = snapshot.messages.iter_mut().find(|m| m.id == id)?;
            message.is_read = true;
            message.clone()
        };
        self.log.lock().await.record_message_read(id, Utc::now());
        Some(updated)
    }

    /// Create a zone; backend errors are returned to the caller
    pub async fn create_zone(&self, zone: NewZone) -> Result<Zone, FleetError> {
        let mode = self.mode().await;
        if let Some(backend) = self.remote(mode) {
            let created = backend.create_zone(&zone).await?;
            self.reload_zones(mode).await;
            return Ok(created);
        }

        let created = zone.into_zone(local_id("zone"));
        self.store.lock().await.zones.push(created.clone());
        self.snapshot.write().await.zones.push(created.clone());
        Ok(created)
    }

    pub async fn update_zone(&self, zone: Zone) -> Result<Zone, FleetError> {
        let mode = self.mode().await;
        if let Some(backend) = self.remote(mode) {
            let updated = backend.update_zone(&zone).await?;
            self.reload_zones(mode).await;
            return Ok(updated);
        }

        let mut zone = zone;
        zone.polygon = crate::models::close_ring(zone.polygon);
        {
            let mut store = self.store.lock().await;
            let slot = store
                .zones
                .iter_mut()
                .find(|z| z.id == zone.id)
                .ok_or_else(|| FleetError::NotFound(format!("zone {}", zone.id)))?;
            *slot = zone.clone();
        }
        let mut snapshot = self.snapshot.write().await;
        match snapshot.zones.iter_mut().find(|z| z.id == zone.id) {
            Some(slot) => *slot = zone.clone(),
            None => snapshot.zones.push(zone.clone()),
        }
        Ok(zone)
    }

    pub async fn delete_zone(&self, id: &str) -> Result<(), FleetError> {
        let mode = self.mode().await;
        if let Some(backend) = self.remote(mode) {
            backend.delete_zone(id).await?;
            self.reload_zones(mode).await;
            return Ok(());
        }

        {
            let mut store = self.store.lock().await;
            let before = store.zones.len();
            store.zones.retain(|z| z.id != id);
            if store.zones.len() == before {
                return Err(FleetError::NotFound(format!("zone {}", id)));
            }
        }
        self.snapshot.write().await.zones.retain(|z| z.id != id);
        Ok(())
    }

    async fn reload_zones(&self, mode: DataSourceMode) {
        let zones = self.fetch_zones(mode).await;
        self.snapshot.write().await.zones = zones;
    }

    /// Create an account; backend errors such as a duplicate email are
    /// returned to the caller
    pub async fn create_user(&self, user: NewUser) -> Result<User, FleetError> {
        let mode = self.mode().await;
        if let Some(backend) = self.remote(mode) {
            let created = backend.create_user(&user).await?;
            self.load_users().await;
            return Ok(created);
        }

        let created = user.into_user(VesselId::from_trusted(&local_id("user")));
        self.store.lock().await.users.push(created.clone());
        self.snapshot.write().await.users.push(created.clone());
        Ok(created)
    }

    pub async fn update_user(&self, user: User) -> Result<User, FleetError> {
        let mode = self.mode().await;
        if let Some(backend) = self.remote(mode) {
            let updated = backend.update_user(&user).await?;
            self.load_users().await;
            return Ok(updated);
        }

        {
            let mut store = self.store.lock().await;
            let slot = store
                .users
                .iter_mut()
                .find(|u| u.id == user.id)
                .ok_or_else(|| FleetError::NotFound(format!("user {}", user.id)))?;
            *slot = user.clone();
        }
        let mut snapshot = self.snapshot.write().await;
        match snapshot.users.iter_mut().find(|u| u.id == user.id) {
            Some(slot) => *slot = user.clone(),
            None => snapshot.users.push(user.clone()),
        }
        Ok(user)
    }

    pub async fn delete_user(&self, id: &VesselId) -> Result<(), FleetError> {
        let mode = self.mode().await;
        if let Some(backend) = self.remote(mode) {
            backend.delete_user(id).await?;
            self.load_users().await;
            return Ok(());
        }

        {
            let mut store = self.store.lock().await;
            let before = store.users.len();
            store.users.retain(|u| &u.id != id);
            if store.users.len() == before {
                return Err(FleetError::NotFound(format!("user {}", id)));
            }
        }
        self.snapshot.write().await.users.retain(|u| &u.id != id);
        Ok(())
    }

    /// Copy of the current snapshot
    pub async fn snapshot(&self) -> FleetSnapshot {
        self.snapshot.read().await.clone()
    }

    pub async fn alerts(&self) -> Vec<Alert> {
        self.snapshot.read().await.alerts.clone()
    }

    pub async fn messages(&self) -> Vec<Message> {
        self.snapshot.read().await.messages.clone()
    }

    /// Retained location window, newest first
    pub async fn locations(&self) -> Vec<LocationSample> {
        self.snapshot.read().await.locations.iter().cloned().collect()
    }

    /// Fleet-wide counts, for organization and admin accounts only
    pub async fn stats(&self, role: Role) -> Option<FleetStats> {
        match role {
            Role::Fisherman => None,
            Role::Organization | Role::Admin => Some(self.snapshot.read().await.stats()),
        }
    }

    /// Timeline over trips, alerts, messages and locations
    pub async fn history(&self) -> HistoryView {
        let snapshot = self.snapshot.read().await;
        HistoryView::from_snapshot(&snapshot)
    }

    /// Shared simulator, for drills
    pub fn simulator(&self) -> Arc<Mutex<TelemetrySimulator>> {
        self.simulator.clone()
    }

    /// Refresh on a timer until the returned handle is stopped
    pub fn spawn_refresh(self: Arc<Self>, period: Duration) -> RefreshHandle {
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        info!("Starting refresh loop: interval={:?}", period);
        let handle = tokio::spawn(async move {
            let mut interval =
                tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {
                        let mode = self.refresh_cycle().await;
                        debug!("Refresh cycle done: mode={:?}", mode);
                    }
                }
            }
        });

        RefreshHandle {
            cancel,
            handle: Some(handle),
        }
    }
}

/// Running refresh loop
pub struct RefreshHandle {
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl RefreshHandle {
    pub async fn stop(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                error!("Refresh task failed: {}", e);
            }
        }
        info!("Refresh loop stopped");
    }
}

impl Drop for RefreshHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Builder for FleetDataAggregator
pub struct FleetDataAggregatorBuilder {
    backend: Option<Arc<dyn FleetBackend>>,
    credentials: Option<TokenStore>,
    simulator: Option<Arc<Mutex<TelemetrySimulator>>>,
    weather: Option<WeatherService>,
    location_window: usize,
}

impl Default for FleetDataAggregatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FleetDataAggregatorBuilder {
    pub fn new() -> Self {
        Self {
            backend: None,
            credentials: None,
            simulator: None,
            weather: None,
            location_window: LOCATION_WINDOW,
        }
    }

    pub fn backend(mut self, backend: Arc<dyn FleetBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn credentials(mut self, credentials: TokenStore) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn simulator(mut self, simulator: Arc<Mutex<TelemetrySimulator>>) -> Self {
        self.simulator = Some(simulator);
        self
    }

    pub fn weather(mut self, weather: WeatherService) -> Self {
        self.weather = Some(weather);
        self
    }

    pub fn location_window(mut self, window: usize) -> Self {
        self.location_window = window;
        self
    }

    pub fn build(self) -> Result<FleetDataAggregator, FleetError> {
        if self.location_window == 0 {
            return Err(FleetError::ConfigurationError {
                message: "Location window must hold at least one sample".to_string(),
            });
        }

        let simulator = match self.simulator {
            Some(simulator) => simulator,
            None => Arc::new(Mutex::new(TelemetrySimulator::new(
                &SimulatorConfig::default(),
                demo::roster(),
            ))),
        };
        let center = simulator
            .try_lock()
            .map(|sim| sim.center())
            .map_err(|_| FleetError::ConfigurationError {
                message: "Simulator is locked while building the aggregator".to_string(),
            })?;
        let weather = self
            .weather
            .unwrap_or_else(|| WeatherService::new(WeatherSynthesizer::new(None), None));

        Ok(FleetDataAggregator {
            backend: self.backend,
            credentials: self.credentials,
            simulator,
            weather,
            log: Mutex::new(EventLog::new()),
            store: Mutex::new(DemoStore::seeded(center, Utc::now())),
            snapshot: RwLock::new(FleetSnapshot::default()),
            location_window: self.location_window,
        })
    }
}

//! Synthetic vessel telemetry for demo and offline operation
//!
//! Each vessel random-walks around a reference center. A move that would
//! leave the bound radius is discarded and the vessel turns back instead.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::{rngs::SmallRng, Rng, SeedableRng};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    config::SimulatorConfig,
    models::{Coordinate, LocationSample, VesselId, KM_PER_DEGREE},
};

const KNOTS_TO_KMH: f64 = 1.852;
const MIN_SPEED_KNOTS: f64 = 2.0;
const MAX_SPEED_KNOTS: f64 = 15.0;
const MIN_INITIAL_SPEED_KNOTS: f64 = 3.0;
const HEADING_JITTER_DEG: f64 = 10.0;
const SPEED_JITTER_KNOTS: f64 = 1.0;
/// How far past the bound radius the violation drill places a vessel
const VIOLATION_OVERSHOOT: f64 = 1.2;

/// Kinematic state of one simulated vessel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KinematicState {
    pub lat: f64,
    pub lon: f64,
    /// Degrees, [0, 360)
    pub heading: f64,
    /// Knots
    pub speed: f64,
    pub updated_at: DateTime<Utc>,
}

impl KinematicState {
    fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lon)
    }

    fn sample(&self, vessel_id: &VesselId) -> LocationSample {
        LocationSample {
            vessel_id: vessel_id.clone(),
            lat: self.lat,
            lon: self.lon,
            speed: self.speed,
            heading: self.heading,
            timestamp: self.updated_at,
        }
    }
}

/// Random-walk position simulator for a fixed roster of vessels
pub struct TelemetrySimulator {
    center: Coordinate,
    bound_radius_km: f64,
    tick_interval: Duration,
    states: BTreeMap<VesselId, KinematicState>,
    rng: SmallRng,
}

impl TelemetrySimulator {
    /// Place every vessel of the roster inside the bound radius
    pub fn new(config: &SimulatorConfig, roster: impl IntoIterator<Item = VesselId>) -> Self {
        let rng = match config.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };
        let mut simulator = Self {
            center: Coordinate::new(config.center_lat, config.center_lon),
            bound_radius_km: config.bound_radius_km,
            tick_interval: config.tick_interval,
            states: BTreeMap::new(),
            rng,
        };

        let now = Utc::now();
        for vessel_id in roster {
            let state = simulator.initial_state(now);
            simulator.states.insert(vessel_id, state);
        }

        info!(
            "Telemetry simulator ready: vessels={}, center=({}, {}), radius={}km",
            simulator.states.len(),
            simulator.center.lat,
            simulator.center.lon,
            simulator.bound_radius_km
        );

        simulator
    }

    fn initial_state(&mut self, now: DateTime<Utc>) -> KinematicState {
        // sqrt keeps the spread uniform over the disc
        let distance_km = self.bound_radius_km * self.rng.gen::<f64>().sqrt();
        let bearing = self.rng.gen_range(0.0..360.0);
        let position = self.offset(bearing, distance_km);

        KinematicState {
            lat: position.lat,
            lon: position.lon,
            heading: self.rng.gen_range(0.0..360.0),
            speed: self
                .rng
                .gen_range(MIN_INITIAL_SPEED_KNOTS..=MAX_SPEED_KNOTS),
            updated_at: now,
        }
    }

    /// Point at `distance_km` from the center along `bearing` degrees
    fn offset(&self, bearing: f64, distance_km: f64) -> Coordinate {
        let rad = bearing.to_radians();
        let dlat = distance_km * rad.cos() / KM_PER_DEGREE;
        let dlon =
            distance_km * rad.sin() / (KM_PER_DEGREE * self.center.lat.to_radians().cos());
        Coordinate::new(self.center.lat + dlat, self.center.lon + dlon)
    }

    pub fn center(&self) -> Coordinate {
        self.center
    }

    pub fn bound_radius_km(&self) -> f64 {
        self.bound_radius_km
    }

    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    /// Largest distance a vessel can cover in one tick
    pub fn max_step_km(&self) -> f64 {
        MAX_SPEED_KNOTS * KNOTS_TO_KMH * self.tick_interval.as_secs_f64() / 3600.0
    }

    /// Vessel ids in roster order
    pub fn roster(&self) -> Vec<VesselId> {
        self.states.keys().cloned().collect()
    }

    pub fn state(&self, vessel_id: &VesselId) -> Option<&KinematicState> {
        self.states.get(vessel_id)
    }

    pub fn distance_from_center_km(&self, vessel_id: &VesselId) -> Option<f64> {
        self.states
            .get(vessel_id)
            .map(|state| state.coordinate().distance_km(&self.center))
    }

    /// Advance every vessel by one tick and return the new positions
    pub fn advance(&mut self, now: DateTime<Utc>) -> Vec<LocationSample> {
        let hours = self.tick_interval.as_secs_f64() / 3600.0;
        let center = self.center;
        let radius = self.bound_radius_km;

        for (vessel_id, state) in self.states.iter_mut() {
            let distance_km = state.speed * KNOTS_TO_KMH * hours;
            let heading = state.heading.to_radians();
            let dlat = distance_km / KM_PER_DEGREE * heading.cos();
            let dlon = distance_km / (KM_PER_DEGREE * state.lat.to_radians().cos()) * heading.sin();
            let tentative = Coordinate::new(state.lat + dlat, state.lon + dlon);

            let current_distance = state.coordinate().distance_km(&center);
            let tentative_distance = tentative.distance_km(&center);

            // A vessel already outside (violation drill) may still move inwards
            if tentative_distance > radius && tentative_distance >= current_distance {
                debug!("Vessel {} reached the boundary, turning back", vessel_id);
                state.heading = normalize_heading(state.heading + 180.0);
            } else {
                state.lat = tentative.lat;
                state.lon = tentative.lon;
            }

            let heading_jitter = self.rng.gen_range(-HEADING_JITTER_DEG..=HEADING_JITTER_DEG);
            let speed_jitter = self.rng.gen_range(-SPEED_JITTER_KNOTS..=SPEED_JITTER_KNOTS);
            state.heading = normalize_heading(state.heading + heading_jitter);
            state.speed = (state.speed + speed_jitter).clamp(MIN_SPEED_KNOTS, MAX_SPEED_KNOTS);
            state.updated_at = now;
        }

        self.current_positions()
    }

    /// Latest position of every vessel
    pub fn current_positions(&self) -> Vec<LocationSample> {
        self.states
            .iter()
            .map(|(vessel_id, state)| state.sample(vessel_id))
            .collect()
    }

    pub fn position_for(&self, vessel_id: &VesselId) -> Option<LocationSample> {
        self.states
            .get(vessel_id)
            .map(|state| state.sample(vessel_id))
    }

    /// Zone-violation drill: push the vessel outward past the bound radius
    pub fn trigger_zone_violation(&mut self, vessel_id: &VesselId) -> Option<LocationSample> {
        let state = *self.states.get(vessel_id)?;

        let north_km = (state.lat - self.center.lat) * KM_PER_DEGREE;
        let east_km = (state.lon - self.center.lon)
            * KM_PER_DEGREE
            * self.center.lat.to_radians().cos();
        let bearing = if north_km == 0.0 && east_km == 0.0 {
            state.heading
        } else {
            normalize_heading(east_km.atan2(north_km).to_degrees())
        };
        let position = self.offset(bearing, self.bound_radius_km * VIOLATION_OVERSHOOT);

        warn!("Zone violation drill on vessel {}", vessel_id);

        let state = self.states.get_mut(vessel_id)?;
        state.lat = position.lat;
        state.lon = position.lon;
        state.heading = bearing;
        state.updated_at = Utc::now();
        Some(state.sample(vessel_id))
    }

    /// Emergency drill: stop the vessel where it is
    pub fn trigger_emergency(&mut self, vessel_id: &VesselId) -> Option<LocationSample> {
        let state = self.states.get_mut(vessel_id)?;
        warn!("Emergency drill on vessel {}", vessel_id);
        state.speed = 0.0;
        state.updated_at = Utc::now();
        Some(state.sample(vessel_id))
    }
}

/// Wrap a heading into [0, 360)
pub fn normalize_heading(heading: f64) -> f64 {
    let wrapped = heading.rem_euclid(360.0);
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Owns a simulator and drives its ticks on a timer
///
/// Samples are pushed to the channel given to [`SimulationService::start`].
/// The timer stops on [`SimulationService::stop`] or when the service is
/// dropped.
pub struct SimulationService {
    simulator: Arc<Mutex<TelemetrySimulator>>,
    tick_interval: Duration,
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl SimulationService {
    pub fn new(simulator: TelemetrySimulator) -> Self {
        let tick_interval = simulator.tick_interval();
        Self {
            simulator: Arc::new(Mutex::new(simulator)),
            tick_interval,
            cancel: CancellationToken::new(),
            handle: None,
        }
    }

    /// Shared handle for queries and drills
    pub fn simulator(&self) -> Arc<Mutex<TelemetrySimulator>> {
        self.simulator.clone()
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Start ticking, sending every new sample to `tx`
    pub fn start(&mut self, tx: mpsc::Sender<LocationSample>) {
        if self.is_running() {
            warn!("Simulation already running");
            return;
        }

        self.cancel = CancellationToken::new();
        let cancel = self.cancel.clone();
        let simulator = self.simulator.clone();
        let period = self.tick_interval;

        info!("Starting simulation: tick_interval={:?}", period);
        self.handle = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = interval.tick() => {
                        let samples = simulator.lock().await.advance(Utc::now());
                        for sample in samples {
                            tokio::select! {
                                _ = cancel.cancelled() => return,
                                sent = tx.send(sample) => {
                                    if sent.is_err() {
                                        info!("Sample receiver closed, stopping simulation");
                                        return;
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }));
    }

    /// Stop ticking and wait for the timer task to finish
    pub async fn stop(&mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                error!("Simulation task failed: {}", e);
            }
            info!("Simulation stopped");
        }
    }
}

impl Drop for SimulationService {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster(n: usize) -> Vec<VesselId> {
        (1..=n)
            .map(|i| VesselId::try_from(format!("vessel-{}", i)).unwrap())
            .collect()
    }

    fn seeded_config(seed: u64) -> SimulatorConfig {
        SimulatorConfig {
            seed: Some(seed),
            ..SimulatorConfig::default()
        }
    }

    #[test]
    fn initial_positions_inside_radius() {
        for seed in 0..20 {
            let sim = TelemetrySimulator::new(&seeded_config(seed), roster(10));
            for id in sim.roster() {
                let state = sim.state(&id).unwrap();
                assert!(sim.distance_from_center_km(&id).unwrap() <= sim.bound_radius_km() + 1e-9);
                assert!((0.0..360.0).contains(&state.heading));
                assert!((3.0..=15.0).contains(&state.speed));
            }
        }
    }

    #[test]
    fn motion_stays_bounded() {
        let mut config = seeded_config(7);
        config.bound_radius_km = 1.0;
        config.tick_interval = Duration::from_secs(120);
        let mut sim = TelemetrySimulator::new(&config, roster(8));
        let limit = sim.bound_radius_km() + sim.max_step_km();

        for _ in 0..1000 {
            let samples = sim.advance(Utc::now());
            assert_eq!(samples.len(), 8);
            for sample in samples {
                let distance = sample.coordinate().distance_km(&sim.center());
                assert!(distance <= limit, "distance {} > {}", distance, limit);
                assert!((0.0..360.0).contains(&sample.heading));
                assert!((MIN_SPEED_KNOTS..=MAX_SPEED_KNOTS).contains(&sample.speed));
            }
        }
    }

    #[test]
    fn vessel_turns_back_at_boundary() {
        let mut sim = TelemetrySimulator::new(&seeded_config(3), roster(1));
        let id = sim.roster().remove(0);
        {
            let edge = sim.offset(0.0, sim.bound_radius_km() - 1e-6);
            let state = sim.states.get_mut(&id).unwrap();
            state.lat = edge.lat;
            state.lon = edge.lon;
            state.heading = 0.0;
            state.speed = 15.0;
        }
        let before = sim.position_for(&id).unwrap();

        let after = sim.advance(Utc::now()).remove(0);

        assert_eq!(after.lat, before.lat);
        assert_eq!(after.lon, before.lon);
        // reversed to 180 plus at most 10 degrees of jitter
        assert!((170.0..=190.0).contains(&after.heading));
    }

    #[test]
    fn zone_violation_drill_moves_vessel_outside() {
        let mut sim = TelemetrySimulator::new(&seeded_config(11), roster(3));
        let id = sim.roster()[1].clone();

        let sample = sim.trigger_zone_violation(&id).unwrap();
        let queried = sim.position_for(&id).unwrap();

        assert_eq!(sample, queried);
        assert!(queried.coordinate().distance_km(&sim.center()) > sim.bound_radius_km());
    }

    #[test]
    fn violated_vessel_never_drifts_further_out() {
        let mut config = seeded_config(5);
        config.tick_interval = Duration::from_secs(300);
        let mut sim = TelemetrySimulator::new(&config, roster(1));
        let id = sim.roster().remove(0);
        sim.trigger_zone_violation(&id);
        let mut previous = sim.distance_from_center_km(&id).unwrap();

        for _ in 0..200 {
            sim.advance(Utc::now());
            let distance = sim.distance_from_center_km(&id).unwrap();
            if previous > sim.bound_radius_km() {
                assert!(distance <= previous + 1e-9);
            }
            previous = distance;
        }
    }

    #[test]
    fn emergency_drill_stops_vessel() {
        let mut sim = TelemetrySimulator::new(&seeded_config(13), roster(2));
        let id = sim.roster()[0].clone();

        let sample = sim.trigger_emergency(&id).unwrap();

        assert_eq!(sample.speed, 0.0);
        assert_eq!(sim.state(&id).unwrap().speed, 0.0);

        let resumed = sim.advance(Utc::now());
        assert!(resumed[0].speed >= MIN_SPEED_KNOTS);
    }

    #[test]
    fn unknown_vessel_queries() {
        let mut sim = TelemetrySimulator::new(&seeded_config(1), roster(2));
        let unknown = VesselId::try_from("ghost").unwrap();

        assert!(sim.position_for(&unknown).is_none());
        assert!(sim.trigger_emergency(&unknown).is_none());
        assert!(sim.trigger_zone_violation(&unknown).is_none());
    }

    #[test]
    fn heading_normalization() {
        assert_eq!(normalize_heading(370.0), 10.0);
        assert_eq!(normalize_heading(-10.0), 350.0);
        assert_eq!(normalize_heading(360.0), 0.0);
        assert!(normalize_heading(-1e-20) < 360.0);
    }

    #[tokio::test]
    async fn service_emits_samples_until_stopped() {
        let mut config = seeded_config(2);
        config.tick_interval = Duration::from_millis(10);
        let mut service = SimulationService::new(TelemetrySimulator::new(&config, roster(2)));
        let (tx, mut rx) = mpsc::channel(16);

        service.start(tx);
        assert!(service.is_running());

        let sample = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(sample.vessel_id.as_str().starts_with("vessel-"));

        service.stop().await;
        assert!(!service.is_running());
    }
}

//! Weather and sea-state readings
//!
//! The synthesizer never fails. A configured provider is tried first and any
//! network or parse error falls back to synthesis.

use std::f64::consts::PI;
use std::time::Duration;

use chrono::{DateTime, Datelike, Timelike, Utc};
use rand::{rngs::SmallRng, Rng, SeedableRng};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::{
    config::WeatherConfig,
    errors::FleetError,
    models::{Coordinate, WeatherCondition, WeatherReading, WeatherSource},
};

const MS_TO_KNOTS: f64 = 1.943_844;
/// Prevailing north-westerly trade wind
const DOMINANT_WIND_BEARING: f64 = 315.0;
const WIND_SPREAD_DEG: f64 = 30.0;
const DIURNAL_AMPLITUDE_C: f64 = 4.0;

/// Plausible weather from season and time of day
pub struct WeatherSynthesizer {
    rng: SmallRng,
    dominant_bearing: f64,
}

impl WeatherSynthesizer {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };
        Self {
            rng,
            dominant_bearing: DOMINANT_WIND_BEARING,
        }
    }

    pub fn synthesize(&mut self, now: DateTime<Utc>) -> WeatherReading {
        let month = now.month();
        let hour = now.hour() as f64 + now.minute() as f64 / 60.0;

        let baseline = match month {
            12 | 1 | 2 => 22.0,
            6..=8 => 28.0,
            _ => 25.0,
        };
        // peaks at 14h
        let diurnal = DIURNAL_AMPLITUDE_C * (2.0 * PI * (hour - 8.0) / 24.0).sin();
        let temperature_c = baseline + diurnal;

        let wind_speed_knots = self.rng.gen_range(8.0..=20.0);
        let wind_direction_deg = (self.dominant_bearing
            + self.rng.gen_range(-WIND_SPREAD_DEG..=WIND_SPREAD_DEG))
        .rem_euclid(360.0);

        let wave_baseline = match month {
            11 | 12 | 1 | 2 | 3 => 1.5,
            _ => 1.0,
        };
        let wave_height_m = wave_baseline + self.rng.gen_range(0.0..1.0);

        let humidity_pct = self.rng.gen_range(60.0..=85.0);
        let condition = classify(wind_speed_knots, wave_height_m, humidity_pct);

        WeatherReading {
            temperature_c,
            wind_speed_knots,
            wind_direction_deg,
            wave_height_m,
            visibility_km: self.rng.gen_range(8.0..=15.0),
            pressure_hpa: self.rng.gen_range(1010.0..=1020.0),
            humidity_pct,
            condition,
            icon: condition.icon().to_string(),
            timestamp: now,
            source: WeatherSource::Synthetic,
        }
    }
}

fn classify(wind_speed_knots: f64, wave_height_m: f64, humidity_pct: f64) -> WeatherCondition {
    if wave_height_m > 2.0 {
        WeatherCondition::RoughSea
    } else if wind_speed_knots > 17.0 {
        WeatherCondition::Windy
    } else if humidity_pct > 78.0 {
        WeatherCondition::PartlyCloudy
    } else {
        WeatherCondition::Clear
    }
}

/// Current-conditions payload of the weather provider
#[derive(Debug, Deserialize)]
struct ProviderResponse {
    main: ProviderMain,
    wind: ProviderWind,
    /// Metres
    visibility: f64,
    #[serde(default)]
    weather: Vec<ProviderSummary>,
}

#[derive(Debug, Deserialize)]
struct ProviderMain {
    temp: f64,
    pressure: f64,
    humidity: f64,
}

#[derive(Debug, Deserialize)]
struct ProviderWind {
    /// Metres per second
    speed: f64,
    deg: f64,
}

#[derive(Debug, Deserialize)]
struct ProviderSummary {
    main: String,
    icon: String,
}

/// HTTP weather provider
pub struct WeatherProvider {
    client: reqwest::Client,
    url: String,
    api_key: String,
}

impl WeatherProvider {
    pub fn new(url: &str, api_key: &str, timeout: Duration) -> Result<Self, FleetError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.to_string(),
            api_key: api_key.to_string(),
        })
    }

    /// Fetch conditions and lay them over `fallback`
    ///
    /// The provider has no sea state, so wave height is kept from `fallback`.
    async fn fetch(
        &self,
        at: Coordinate,
        fallback: &WeatherReading,
    ) -> Result<WeatherReading, FleetError> {
        let response = self
            .client
            .get(&self.url)
            .query(&[
                ("lat", at.lat.to_string()),
                ("lon", at.lon.to_string()),
                ("appid", self.api_key.clone()),
                ("units", "metric".to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FleetError::BackendStatus {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let body = response.text().await?;
        let parsed: ProviderResponse =
            serde_json::from_str(&body).map_err(|e| FleetError::MalformedResponse {
                category: "weather".to_string(),
                origin: e.to_string(),
            })?;

        let wind_speed_knots = parsed.wind.speed * MS_TO_KNOTS;
        let condition = match parsed.weather.first().map(|w| w.main.as_str()) {
            Some("Clear") => WeatherCondition::Clear,
            Some("Clouds") | Some("Rain") | Some("Drizzle") | Some("Mist") => {
                WeatherCondition::PartlyCloudy
            }
            _ => classify(wind_speed_knots, fallback.wave_height_m, parsed.main.humidity),
        };
        let icon = parsed
            .weather
            .first()
            .map(|w| w.icon.clone())
            .unwrap_or_else(|| condition.icon().to_string());

        Ok(WeatherReading {
            temperature_c: parsed.main.temp,
            wind_speed_knots,
            wind_direction_deg: parsed.wind.deg.rem_euclid(360.0),
            wave_height_m: fallback.wave_height_m,
            visibility_km: parsed.visibility / 1000.0,
            pressure_hpa: parsed.main.pressure,
            humidity_pct: parsed.main.humidity,
            condition,
            icon,
            timestamp: fallback.timestamp,
            source: WeatherSource::Provider,
        })
    }
}

/// Weather lookup that always yields a reading
pub struct WeatherService {
    synthesizer: Mutex<WeatherSynthesizer>,
    provider: Option<WeatherProvider>,
}

impl WeatherService {
    pub fn new(synthesizer: WeatherSynthesizer, provider: Option<WeatherProvider>) -> Self {
        Self {
            synthesizer: Mutex::new(synthesizer),
            provider,
        }
    }

    /// Build from configuration; a provider needs both a URL and a key
    pub fn from_config(
        config: &WeatherConfig,
        timeout: Duration,
        seed: Option<u64>,
    ) -> Result<Self, FleetError> {
        let provider = match (&config.provider_url, &config.api_key) {
            (Some(url), Some(key)) => Some(WeatherProvider::new(url, key, timeout)?),
            _ => None,
        };
        Ok(Self::new(WeatherSynthesizer::new(seed), provider))
    }

    /// Current reading at `at`
    pub async fn current(&self, at: Coordinate, now: DateTime<Utc>) -> WeatherReading {
        let synthetic = self.synthesizer.lock().await.synthesize(now);

        let Some(provider) = &self.provider else {
            return synthetic;
        };

        match provider.fetch(at, &synthetic).await {
            Ok(reading) => {
                debug!("Weather provider reading: {:?}", reading.condition);
                reading
            }
            Err(e) => {
                warn!("Weather provider failed, using synthetic reading: {}", e);
                synthetic
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn assert_well_formed(reading: &WeatherReading) {
        assert!((-10.0..=50.0).contains(&reading.temperature_c));
        assert!(reading.wave_height_m >= 0.0);
        assert!(reading.wind_speed_knots >= 0.0);
        assert!((0.0..360.0).contains(&reading.wind_direction_deg));
        assert!(reading.visibility_km > 0.0);
        assert!(reading.pressure_hpa > 900.0);
        assert!((0.0..=100.0).contains(&reading.humidity_pct));
        assert!(!reading.icon.is_empty());
    }

    #[test]
    fn synthesized_reading_within_bands() {
        let mut synth = WeatherSynthesizer::new(Some(9));
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 3, 0, 0).unwrap();

        for _ in 0..200 {
            let reading = synth.synthesize(now);
            assert_well_formed(&reading);
            assert!((8.0..=20.0).contains(&reading.wind_speed_knots));
            // winter sea state is higher
            assert!((1.5..2.5).contains(&reading.wave_height_m));
            assert_eq!(reading.source, WeatherSource::Synthetic);
        }
    }

    #[test]
    fn afternoon_warmer_than_night() {
        let mut synth = WeatherSynthesizer::new(Some(1));
        let afternoon = synth.synthesize(Utc.with_ymd_and_hms(2024, 7, 1, 14, 0, 0).unwrap());
        let night = synth.synthesize(Utc.with_ymd_and_hms(2024, 7, 1, 2, 0, 0).unwrap());

        assert!(afternoon.temperature_c > night.temperature_c);
        assert!((afternoon.temperature_c - 32.0).abs() < 1e-9);
    }

    #[test]
    fn summer_warmer_than_winter() {
        let mut synth = WeatherSynthesizer::new(Some(1));
        let summer = synth.synthesize(Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap());
        let winter = synth.synthesize(Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap());

        assert!(summer.temperature_c > winter.temperature_c);
    }

    #[tokio::test]
    async fn provider_failure_falls_back_to_synthesis() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let provider =
            WeatherProvider::new(&server.uri(), "key", Duration::from_secs(2)).unwrap();
        let service = WeatherService::new(WeatherSynthesizer::new(Some(4)), Some(provider));

        let reading = service
            .current(Coordinate::new(14.69, -17.44), Utc::now())
            .await;

        assert_eq!(reading.source, WeatherSource::Synthetic);
        assert_well_formed(&reading);
    }

    #[tokio::test]
    async fn malformed_provider_payload_falls_back() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"cod\": 401}"))
            .mount(&server)
            .await;

        let provider =
            WeatherProvider::new(&server.uri(), "key", Duration::from_secs(2)).unwrap();
        let service = WeatherService::new(WeatherSynthesizer::new(Some(4)), Some(provider));

        let reading = service
            .current(Coordinate::new(14.69, -17.44), Utc::now())
            .await;

        assert_eq!(reading.source, WeatherSource::Synthetic);
    }

    #[tokio::test]
    async fn provider_values_substitute_field_for_field() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("units", "metric"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "weather": [{ "main": "Clear", "icon": "01d" }],
                "main": { "temp": 27.5, "pressure": 1013.0, "humidity": 70.0 },
                "visibility": 10000,
                "wind": { "speed": 5.0, "deg": 320.0 }
            })))
            .mount(&server)
            .await;

        let provider =
            WeatherProvider::new(&server.uri(), "key", Duration::from_secs(2)).unwrap();
        let service = WeatherService::new(WeatherSynthesizer::new(Some(4)), Some(provider));

        let reading = service
            .current(Coordinate::new(14.69, -17.44), Utc::now())
            .await;

        assert_eq!(reading.source, WeatherSource::Provider);
        assert_eq!(reading.temperature_c, 27.5);
        assert_eq!(reading.visibility_km, 10.0);
        assert_eq!(reading.condition, WeatherCondition::Clear);
        assert_eq!(reading.icon, "01d");
        assert!((reading.wind_speed_knots - 9.719_22).abs() < 1e-3);
        assert!(reading.wave_height_m >= 0.0);
    }
}

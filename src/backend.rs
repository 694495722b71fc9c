//! REST backend client
//!
//! [`FleetBackend`] is the request/response contract the aggregator relies
//! on. [`HttpBackend`] implements it over HTTP with a bearer token.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};
use tracing::debug;

use crate::{
    credentials::TokenStore,
    errors::FleetError,
    models::{
        Alert, Device, LocationSample, Message, NewAlert, NewMessage, NewUser, NewZone,
        PositionReport, Trip, User, VesselId, Zone,
    },
};

/// Remote fleet backend
#[async_trait]
pub trait FleetBackend: Send + Sync {
    /// Lightweight authenticated request used to decide connectivity
    async fn probe(&self) -> Result<(), FleetError>;

    async fn list_users(&self) -> Result<Vec<User>, FleetError>;
    async fn create_user(&self, user: &NewUser) -> Result<User, FleetError>;
    async fn update_user(&self, user: &User) -> Result<User, FleetError>;
    async fn delete_user(&self, id: &VesselId) -> Result<(), FleetError>;

    async fn list_locations(&self) -> Result<Vec<LocationSample>, FleetError>;
    async fn create_location(&self, report: &PositionReport) -> Result<LocationSample, FleetError>;

    async fn list_alerts(&self) -> Result<Vec<Alert>, FleetError>;
    async fn create_alert(&self, alert: &NewAlert) -> Result<Alert, FleetError>;
    async fn acknowledge_alert(&self, id: &str) -> Result<(), FleetError>;
    async fn resolve_alert(&self, id: &str) -> Result<(), FleetError>;

    async fn list_messages(&self) -> Result<Vec<Message>, FleetError>;
    async fn send_message(&self, message: &NewMessage) -> Result<Message, FleetError>;
    async fn mark_message_read(&self, id: &str) -> Result<(), FleetError>;

    async fn list_zones(&self) -> Result<Vec<Zone>, FleetError>;
    async fn create_zone(&self, zone: &NewZone) -> Result<Zone, FleetError>;
    async fn update_zone(&self, zone: &Zone) -> Result<Zone, FleetError>;
    async fn delete_zone(&self, id: &str) -> Result<(), FleetError>;

    async fn list_trips(&self, user_id: &VesselId) -> Result<Vec<Trip>, FleetError>;
    async fn list_devices(&self) -> Result<Vec<Device>, FleetError>;
}

/// Error payload returned by the backend on validation failures
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(alias = "error", alias = "detail")]
    message: String,
}

/// How a non-success status is reported
#[derive(Debug, Clone, Copy, PartialEq)]
enum Failure {
    /// Any failure means the backend is unavailable for this category
    Unavailable,
    /// Client errors carry a message the caller should show
    Surface,
}

/// Where the bearer token comes from
#[derive(Debug, Clone)]
enum Credential {
    Fixed(String),
    /// Re-read on every request so a saved or rotated token is picked up
    Stored(TokenStore),
}

pub struct HttpBackend {
    client: Client,
    base_url: String,
    credential: Credential,
}

impl HttpBackend {
    /// Client authenticating with the token currently in `credentials`
    pub fn new(
        base_url: &str,
        credentials: TokenStore,
        timeout: Duration,
    ) -> Result<Self, FleetError> {
        Self::build(base_url, Credential::Stored(credentials), timeout)
    }

    /// Client authenticating with a fixed token
    pub fn with_token(base_url: &str, token: &str, timeout: Duration) -> Result<Self, FleetError> {
        Self::build(base_url, Credential::Fixed(token.to_string()), timeout)
    }

    fn build(base_url: &str, credential: Credential, timeout: Duration) -> Result<Self, FleetError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credential,
        })
    }

    fn token(&self) -> Result<String, FleetError> {
        match &self.credential {
            Credential::Fixed(token) => Ok(token.clone()),
            Credential::Stored(store) => store.load()?.ok_or_else(|| {
                FleetError::BackendUnavailable(format!(
                    "no token stored at {}",
                    store.path().display()
                ))
            }),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.client.get(self.url(path))
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.client.post(self.url(path))
    }

    fn put(&self, path: &str) -> RequestBuilder {
        self.client.put(self.url(path))
    }

    fn delete(&self, path: &str) -> RequestBuilder {
        self.client.delete(self.url(path))
    }

    /// Send and return the body of a successful response
    async fn send(
        &self,
        request: RequestBuilder,
        failure: Failure,
    ) -> Result<String, FleetError> {
        let response = request.bearer_auth(self.token()?).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            return Ok(body);
        }

        debug!("Backend returned {}: {}", status, body);
        if failure == Failure::Surface && status.is_client_error() && status != StatusCode::UNAUTHORIZED
        {
            let message = serde_json::from_str::<ErrorBody>(&body)
                .map(|e| e.message)
                .unwrap_or_else(|_| body.clone());
            return Err(FleetError::Rejected { message });
        }

        Err(FleetError::BackendStatus {
            status: status.as_u16(),
            body,
        })
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        category: &str,
        failure: Failure,
    ) -> Result<T, FleetError> {
        let body = self.send(request, failure).await?;
        serde_json::from_str(&body).map_err(|e| FleetError::MalformedResponse {
            category: category.to_string(),
            origin: e.to_string(),
        })
    }
}

#[async_trait]
impl FleetBackend for HttpBackend {
    async fn probe(&self) -> Result<(), FleetError> {
        self.send(self.get("/auth/me"), Failure::Unavailable)
            .await
            .map(|_| ())
    }

    async fn list_users(&self) -> Result<Vec<User>, FleetError> {
        self.fetch(self.get("/users"), "users", Failure::Unavailable)
            .await
    }

    async fn create_user(&self, user: &NewUser) -> Result<User, FleetError> {
        self.fetch(self.post("/users").json(user), "users", Failure::Surface)
            .await
    }

    async fn update_user(&self, user: &User) -> Result<User, FleetError> {
        let path = format!("/users/{}", user.id);
        self.fetch(self.put(&path).json(user), "users", Failure::Surface)
            .await
    }

    async fn delete_user(&self, id: &VesselId) -> Result<(), FleetError> {
        let path = format!("/users/{}", id);
        self.send(self.delete(&path), Failure::Surface)
            .await
            .map(|_| ())
    }

    async fn list_locations(&self) -> Result<Vec<LocationSample>, FleetError> {
        self.fetch(self.get("/locations"), "locations", Failure::Unavailable)
            .await
    }

    async fn create_location(&self, report: &PositionReport) -> Result<LocationSample, FleetError> {
        self.fetch(
            self.post("/locations").json(report),
            "locations",
            Failure::Unavailable,
        )
        .await
    }

    async fn list_alerts(&self) -> Result<Vec<Alert>, FleetError> {
        self.fetch(self.get("/alerts"), "alerts", Failure::Unavailable)
            .await
    }

    async fn create_alert(&self, alert: &NewAlert) -> Result<Alert, FleetError> {
        self.fetch(self.post("/alerts").json(alert), "alerts", Failure::Unavailable)
            .await
    }

    async fn acknowledge_alert(&self, id: &str) -> Result<(), FleetError> {
        let path = format!("/alerts/{}/acknowledge", id);
        self.send(self.put(&path), Failure::Unavailable)
            .await
            .map(|_| ())
    }

    async fn resolve_alert(&self, id: &str) -> Result<(), FleetError> {
        let path = format!("/alerts/{}/resolve", id);
        self.send(self.put(&path), Failure::Unavailable)
            .await
            .map(|_| ())
    }

    async fn list_messages(&self) -> Result<Vec<Message>, FleetError> {
        self.fetch(self.get("/messages"), "messages", Failure::Unavailable)
            .await
    }

    async fn send_message(&self, message: &NewMessage) -> Result<Message, FleetError> {
        self.fetch(
            self.post("/messages").json(message),
            "messages",
            Failure::Unavailable,
        )
        .await
    }

    async fn mark_message_read(&self, id: &str) -> Result<(), FleetError> {
        let path = format!("/messages/{}/read", id);
        self.send(self.put(&path), Failure::Unavailable)
            .await
            .map(|_| ())
    }

    async fn list_zones(&self) -> Result<Vec<Zone>, FleetError> {
        self.fetch(self.get("/zones"), "zones", Failure::Unavailable)
            .await
    }

    async fn create_zone(&self, zone: &NewZone) -> Result<Zone, FleetError> {
        self.fetch(self.post("/zones").json(zone), "zones", Failure::Surface)
            .await
    }

    async fn update_zone(&self, zone: &Zone) -> Result<Zone, FleetError> {
        let path = format!("/zones/{}", zone.id);
        self.fetch(self.put(&path).json(zone), "zones", Failure::Surface)
            .await
    }

    async fn delete_zone(&self, id: &str) -> Result<(), FleetError> {
        let path = format!("/zones/{}", id);
        self.send(self.delete(&path), Failure::Surface)
            .await
            .map(|_| ())
    }

    async fn list_trips(&self, user_id: &VesselId) -> Result<Vec<Trip>, FleetError> {
        let request = self.get("/trips").query(&[("userId", user_id.as_str())]);
        self.fetch(request, "trips", Failure::Unavailable).await
    }

    async fn list_devices(&self) -> Result<Vec<Device>, FleetError> {
        self.fetch(self.get("/devices"), "devices", Failure::Unavailable)
            .await
    }
}

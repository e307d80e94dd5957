//! Coordinate acquisition: manual fields or a relayed one-shot geolocation read.
//!
//! The geolocation read happens outside the host (a browser, a helper
//! process, stdin). The host hands out a `GeolocationRequest`; the client
//! answers through its responder; the host observes the answer on a later
//! `poll`. Nothing here blocks.

use std::time::{Duration, Instant};

use serde::Deserialize;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::error::LocationError;
use crate::model::Coordinate;

pub const DEFAULT_GEOLOCATION_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Acquisition {
    Ready(Coordinate),
    /// A request is in flight; keep showing whatever coordinate you had.
    Pending,
}

pub trait LocationSource {
    fn acquire(&mut self) -> Acquisition;
}

/// Two numeric fields, each falling back to a default when left empty.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ManualLocation {
    coordinate: Coordinate,
}

impl ManualLocation {
    pub fn new(latitude: Option<f64>, longitude: Option<f64>) -> Result<Self, LocationError> {
        let coordinate = Coordinate::new(
            latitude.unwrap_or(Coordinate::DEFAULT.latitude()),
            longitude.unwrap_or(Coordinate::DEFAULT.longitude()),
        )?;
        Ok(Self { coordinate })
    }

    pub fn coordinate(&self) -> Coordinate {
        self.coordinate
    }
}

impl LocationSource for ManualLocation {
    fn acquire(&mut self) -> Acquisition {
        Acquisition::Ready(self.coordinate)
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct GeolocationFailure {
    /// Browser `GeolocationPositionError` code: 1 denied, 2 unavailable, 3 timeout.
    #[serde(default)]
    pub code: u16,
    #[serde(default)]
    pub message: String,
}

/// What the client posts back: a position or an error.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum GeolocationMessage {
    Position { latitude: f64, longitude: f64 },
    Error { error: GeolocationFailure },
}

impl GeolocationMessage {
    pub fn parse(line: &str) -> Result<Self, LocationError> {
        serde_json::from_str(line.trim())
            .map_err(|e| LocationError::Unavailable(format!("unreadable geolocation message: {e}")))
    }

    fn into_result(self) -> Result<Coordinate, LocationError> {
        match self {
            Self::Position {
                latitude,
                longitude,
            } => Coordinate::new(latitude, longitude),
            Self::Error { error } => Err(match error.code {
                1 => LocationError::PermissionDenied,
                3 => LocationError::Timeout,
                0 if error.message.to_lowercase().contains("not supported") => {
                    LocationError::Unsupported
                }
                _ => LocationError::Unavailable(error.message),
            }),
        }
    }
}

/// Client half of a geolocation request.
#[derive(Debug)]
pub struct GeolocationRequest {
    pub token: u64,
    reply: oneshot::Sender<GeolocationMessage>,
}

impl GeolocationRequest {
    /// Deliver the client's answer. A host that has given up simply never sees it.
    pub fn respond(self, message: GeolocationMessage) {
        if self.reply.send(message).is_err() {
            debug!("geolocation request {} no longer awaited", self.token);
        }
    }
}

#[derive(Debug)]
struct InFlight {
    token: u64,
    issued_at: Instant,
    reply: oneshot::Receiver<GeolocationMessage>,
}

/// Host half: at most one request in flight, answered asynchronously.
#[derive(Debug)]
pub struct GeolocationBridge {
    timeout: Duration,
    next_token: u64,
    in_flight: Option<InFlight>,
    last_known: Coordinate,
    last_error: Option<LocationError>,
}

impl GeolocationBridge {
    pub fn new(initial: Coordinate, timeout: Duration) -> Self {
        Self {
            timeout,
            next_token: 1,
            in_flight: None,
            last_known: initial,
            last_error: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn last_known(&self) -> Coordinate {
        self.last_known
    }

    pub fn last_error(&self) -> Option<&LocationError> {
        self.last_error.as_ref()
    }

    /// Start a read. Returns `None` while another one is still in flight.
    pub fn request(&mut self) -> Option<GeolocationRequest> {
        if let Some(f) = &self.in_flight {
            debug!("geolocation request {} already in flight", f.token);
            return None;
        }
        let token = self.next_token;
        self.next_token += 1;
        let (tx, rx) = oneshot::channel();
        self.in_flight = Some(InFlight {
            token,
            issued_at: Instant::now(),
            reply: rx,
        });
        info!("geolocation request {token} issued");
        Some(GeolocationRequest { token, reply: tx })
    }

    /// Observe the outcome of the in-flight request, if it has one yet.
    ///
    /// `None` means nothing new: either no request, or still waiting.
    pub fn poll(&mut self) -> Option<Result<Coordinate, LocationError>> {
        let flight = self.in_flight.as_mut()?;
        let outcome = match flight.reply.try_recv() {
            Ok(message) => message.into_result(),
            Err(oneshot::error::TryRecvError::Closed) => Err(LocationError::Unavailable(
                "client went away without answering".to_string(),
            )),
            Err(oneshot::error::TryRecvError::Empty) => {
                if flight.issued_at.elapsed() < self.timeout {
                    return None;
                }
                Err(LocationError::Timeout)
            }
        };
        let token = flight.token;
        self.in_flight = None;
        match &outcome {
            Ok(c) => {
                info!("geolocation request {token} answered: {c}");
                self.last_known = *c;
                self.last_error = None;
            }
            Err(e) => {
                warn!("geolocation request {token} failed: {e}");
                self.last_error = Some(e.clone());
            }
        }
        Some(outcome)
    }
}

impl LocationSource for GeolocationBridge {
    fn acquire(&mut self) -> Acquisition {
        match self.poll() {
            Some(Ok(c)) => Acquisition::Ready(c),
            None if self.is_pending() => Acquisition::Pending,
            _ => Acquisition::Ready(self.last_known),
        }
    }
}

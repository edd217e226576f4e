//! In-memory providers for exercising the router without a network.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;

use parking_lot::Mutex;

use jeepney_router::error::ProviderError;
use jeepney_router::geo::GeoPoint;
use jeepney_router::traits::{ProviderRoute, ReverseGeocoder, RoutingProvider, TextGenerator};

/// Shared record of which provider ran, in order.
pub type CallLog = Arc<Mutex<Vec<String>>>;

pub fn call_log() -> CallLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// Routing provider that answers from a script.
pub struct ScriptedProvider {
    pub name: String,
    pub answer: Result<ProviderRoute, ProviderError>,
    pub log: CallLog,
    pub delay: Duration,
}

impl ScriptedProvider {
    pub fn ok(name: &str, route: ProviderRoute, log: &CallLog) -> Self {
        Self {
            name: name.to_string(),
            answer: Ok(route),
            log: Arc::clone(log),
            delay: Duration::ZERO,
        }
    }

    pub fn failing(name: &str, status: u16, log: &CallLog) -> Self {
        Self {
            name: name.to_string(),
            answer: Err(ProviderError::status(name, status, "upstream unavailable")),
            log: Arc::clone(log),
            delay: Duration::ZERO,
        }
    }

    pub fn slow(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl RoutingProvider for ScriptedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch_route(&self, _: GeoPoint, _: GeoPoint) -> Result<ProviderRoute, ProviderError> {
        self.log.lock().push(self.name.clone());
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        self.answer.clone()
    }
}

/// Reverse geocoder that blocks each call until the test releases it.
pub struct GatedGeocoder {
    release: Mutex<Receiver<String>>,
    pub calls: AtomicUsize,
}

impl GatedGeocoder {
    pub fn new() -> (Arc<Self>, Sender<String>) {
        let (tx, rx) = mpsc::channel();
        let geocoder = Arc::new(Self {
            release: Mutex::new(rx),
            calls: AtomicUsize::new(0),
        });
        (geocoder, tx)
    }
}

impl ReverseGeocoder for GatedGeocoder {
    fn reverse_geocode(&self, point: GeoPoint) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.release
            .lock()
            .recv_timeout(Duration::from_secs(5))
            .map_err(|_| ProviderError::Timeout {
                provider: format!("gated {point}"),
            })
    }
}

/// Text generator returning a canned answer and recording what it was sent.
pub struct CannedGenerator {
    pub answer: Result<String, ProviderError>,
    pub calls: AtomicUsize,
    pub last_message: Mutex<Option<String>>,
}

impl CannedGenerator {
    pub fn answering(answer: &str) -> Arc<Self> {
        Arc::new(Self {
            answer: Ok(answer.to_string()),
            calls: AtomicUsize::new(0),
            last_message: Mutex::new(None),
        })
    }

    pub fn failing(err: ProviderError) -> Arc<Self> {
        Arc::new(Self {
            answer: Err(err),
            calls: AtomicUsize::new(0),
            last_message: Mutex::new(None),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TextGenerator for CannedGenerator {
    fn name(&self) -> &str {
        "canned"
    }

    fn generate_json(&self, _system: &str, user: &str) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_message.lock() = Some(user.to_string());
        self.answer.clone()
    }
}

//! In-memory [`Provider`] test doubles shared by this crate's own tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;

use crate::provider::{Provider, ProviderError};
use crate::{Coordinate, Fix};

/// Build a valid fix at `(lat, lon)`, tagged with `source`.
#[must_use]
pub fn make_fix(source: &str, lat: f64, lon: f64) -> Fix {
    Fix::new(
        Coordinate::new(lat, lon),
        0.0,
        5.0,
        crate::UNKNOWN,
        crate::UNKNOWN,
        crate::UNKNOWN,
        crate::UNKNOWN,
        crate::UNKNOWN,
        SystemTime::now(),
        source,
    )
    .expect("valid coordinate")
}

/// A provider that always succeeds with a fixed coordinate and counts how
/// many times its backend was actually called.
#[derive(Debug)]
pub struct CountingProvider {
    id: String,
    polling_interval: Duration,
    calls: AtomicU64,
}

impl CountingProvider {
    /// Create a new always-succeeding provider.
    #[must_use]
    pub fn new(id: &str, polling_interval: Duration) -> Self {
        Self {
            id: id.to_owned(),
            polling_interval,
            calls: AtomicU64::new(0),
        }
    }

    /// Number of times `request_location` reached the (fake) backend.
    #[must_use]
    pub fn call_count(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Provider for CountingProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn polling_interval(&self) -> Duration {
        self.polling_interval
    }

    async fn request_location(&self) -> Result<Fix, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(make_fix(&self.id, 37.7749, -122.4194))
    }
}

/// A provider that always fails.
#[derive(Debug)]
pub struct FailingProvider {
    id: String,
    polling_interval: Duration,
}

impl FailingProvider {
    /// Create a new always-failing provider.
    #[must_use]
    pub fn new(id: &str, polling_interval: Duration) -> Self {
        Self {
            id: id.to_owned(),
            polling_interval,
        }
    }
}

#[async_trait]
impl Provider for FailingProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn polling_interval(&self) -> Duration {
        self.polling_interval
    }

    async fn request_location(&self) -> Result<Fix, ProviderError> {
        Err(ProviderError::Unavailable(format!("{} is unavailable", self.id)))
    }
}

/// A provider whose outcomes are scripted in advance: each call consumes the
/// next entry, repeating the last entry once the script is exhausted.
#[derive(Debug)]
pub struct ScriptedProvider {
    id: String,
    polling_interval: Duration,
    script: Mutex<Vec<Result<(), ()>>>,
    cursor: AtomicU64,
}

impl ScriptedProvider {
    /// Create a provider that replays `script` in order, `Ok` meaning
    /// "succeed with a fixed fix" and `Err` meaning "fail, unavailable".
    #[must_use]
    pub fn new(id: &str, polling_interval: Duration, script: Vec<Result<(), ()>>) -> Self {
        Self {
            id: id.to_owned(),
            polling_interval,
            script: Mutex::new(script),
            cursor: AtomicU64::new(0),
        }
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn polling_interval(&self) -> Duration {
        self.polling_interval
    }

    async fn request_location(&self) -> Result<Fix, ProviderError> {
        let script = self.script.lock().expect("poisoned");
        if script.is_empty() {
            return Ok(make_fix(&self.id, 37.7749, -122.4194));
        }
        let idx = self.cursor.fetch_add(1, Ordering::SeqCst) as usize;
        let step = script[idx.min(script.len() - 1)];
        match step {
            Ok(()) => Ok(make_fix(&self.id, 37.7749, -122.4194)),
            Err(()) => Err(ProviderError::Unavailable(format!("{} scripted failure", self.id))),
        }
    }
}

/// A provider whose backend call never completes, used to exercise
/// cancellation and per-call timeouts.
#[derive(Debug)]
pub struct HangingProvider {
    id: String,
    polling_interval: Duration,
    timeout: Duration,
}

impl HangingProvider {
    /// Create a new provider that never resolves its backend call, timing
    /// out after `timeout`.
    #[must_use]
    pub fn new(id: &str, polling_interval: Duration, timeout: Duration) -> Self {
        Self {
            id: id.to_owned(),
            polling_interval,
            timeout,
        }
    }
}

#[async_trait]
impl Provider for HangingProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn polling_interval(&self) -> Duration {
        self.polling_interval
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn request_location(&self) -> Result<Fix, ProviderError> {
        std::future::pending::<()>().await;
        unreachable!("pending future never resolves")
    }
}

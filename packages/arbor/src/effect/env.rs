//! The interpreter side of effects.
//!
//! An [`Environment`] owns every capability an effect can touch and routes
//! each [`Effect`] to its category executor. Executors answer synchronously
//! with [`Completion::Ready`] or hand back a future as
//! [`Completion::Pending`]. Either way, panics raised by user code are caught
//! and come back as [`EffectError::Panicked`].

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use anyhow::Result;
use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::{debug, info};
use url::Url;

use super::browser::{GeolocationProvider, NotificationProvider};
use super::exec;
use super::http::{HttpTransport, ReqwestTransport};
use super::random::RandomSource;
use super::storage::{JsonFileStore, KeyValueStore, MemoryStore, Storage};
use super::timer::Timers;
use super::{animation::FrameQueue, Effect, EffectOp, EffectValue};
use crate::config::EngineConfig;
use crate::dom::Document;
use crate::error::EffectError;
use crate::outcome::{attempt, panic_message};

pub type EffectResult = Result<EffectValue, EffectError>;

/// The outcome of handing one effect to its executor.
pub enum Completion {
    Ready(EffectResult),
    Pending(BoxFuture<'static, EffectResult>),
}

impl Completion {
    /// A pending completion whose panics resolve to [`EffectError::Panicked`].
    pub(crate) fn pending<F>(operation: &'static str, future: F) -> Self
    where
        F: std::future::Future<Output = EffectResult> + Send + 'static,
    {
        Completion::Pending(
            AssertUnwindSafe(future)
                .catch_unwind()
                .map(move |outcome| {
                    outcome.unwrap_or_else(|payload| {
                        Err(EffectError::Panicked {
                            operation,
                            message: panic_message(payload.as_ref()),
                        })
                    })
                })
                .boxed(),
        )
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Completion::Pending(_))
    }

    /// The result, waiting for it if pending.
    pub async fn wait(self) -> EffectResult {
        match self {
            Completion::Ready(result) => result,
            Completion::Pending(future) => future.await,
        }
    }

    /// The result if it is already available.
    pub fn into_ready(self) -> Option<EffectResult> {
        match self {
            Completion::Ready(result) => Some(result),
            Completion::Pending(_) => None,
        }
    }
}

impl From<EffectResult> for Completion {
    fn from(result: EffectResult) -> Self {
        Completion::Ready(result)
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Completion::Ready(result) => f.debug_tuple("Ready").field(result).finish(),
            Completion::Pending(_) => f.write_str("Pending(..)"),
        }
    }
}

// =============================================================================
// Environment
// =============================================================================

/// Live capabilities effects run against.
pub struct Environment {
    document: Document,
    storage: Storage,
    timers: Timers,
    random: RandomSource,
    frames: FrameQueue,
    http: Arc<dyn HttpTransport>,
    base_url: Option<Url>,
    geolocation: Option<Arc<dyn GeolocationProvider>>,
    notifications: Option<Arc<dyn NotificationProvider>>,
}

impl Environment {
    pub fn builder(config: EngineConfig) -> EnvironmentBuilder {
        EnvironmentBuilder::new(config)
    }

    /// An environment with default capabilities for `config`.
    pub fn new(config: EngineConfig) -> Result<Self> {
        Self::builder(config).build()
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn timers(&self) -> &Timers {
        &self.timers
    }

    pub fn pending_frames(&self) -> usize {
        self.frames.len()
    }

    /// Flush requested animation frames. Returns how many callbacks ran.
    pub fn run_animation_frame(&mut self, timestamp_ms: f64) -> usize {
        self.frames.run(timestamp_ms)
    }

    /// Interpret one effect.
    ///
    /// Synchronous work happens before this returns; pending work starts
    /// when the returned future is first polled.
    pub fn execute(&mut self, effect: Effect) -> Completion {
        let category = effect.category();
        debug!(
            effect_id = %effect.id(),
            category = %category,
            operation = effect.operation(),
            "executing effect"
        );

        let op = effect.into_op();
        let sync = |result: crate::outcome::Attempt<Completion>| {
            result.unwrap_or_else(|caught| {
                Completion::Ready(Err(EffectError::Panicked {
                    operation: category.as_str(),
                    message: caught.message,
                }))
            })
        };

        match op {
            EffectOp::Dom(op) => sync(attempt(|| exec::dom::execute(&mut self.document, op))),
            EffectOp::Http(op) => {
                exec::http::execute(self.http.clone(), self.base_url.as_ref(), op)
            }
            EffectOp::Storage(op) => {
                sync(attempt(|| exec::storage::execute(&mut self.storage, op).into()))
            }
            EffectOp::Timer(op) => sync(attempt(|| exec::timer::execute(&self.timers, op))),
            EffectOp::Random(op) => {
                sync(attempt(|| exec::random::execute(&self.random, op).into()))
            }
            EffectOp::DateTime(op) => sync(attempt(|| exec::datetime::execute(op).into())),
            EffectOp::Log(op) => sync(attempt(|| exec::log::execute(op).into())),
            EffectOp::Browser(op) => {
                exec::browser::execute(self.geolocation.clone(), self.notifications.clone(), op)
            }
            EffectOp::Animation(op) => {
                sync(attempt(|| exec::animation::execute(&mut self.frames, op).into()))
            }
            EffectOp::Async(op) => exec::task::execute(op),
        }
    }
}

impl Drop for Environment {
    fn drop(&mut self) {
        self.timers.cancel_all();
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("storage", &self.storage)
            .field("timers", &self.timers)
            .field("frames", &self.frames)
            .field("base_url", &self.base_url)
            .field("geolocation", &self.geolocation.is_some())
            .field("notifications", &self.notifications.is_some())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Builder
// =============================================================================

pub struct EnvironmentBuilder {
    config: EngineConfig,
    document: Option<Document>,
    transport: Option<Arc<dyn HttpTransport>>,
    local: Option<Box<dyn KeyValueStore>>,
    session: Option<Box<dyn KeyValueStore>>,
    geolocation: Option<Arc<dyn GeolocationProvider>>,
    notifications: Option<Arc<dyn NotificationProvider>>,
}

impl EnvironmentBuilder {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            document: None,
            transport: None,
            local: None,
            session: None,
            geolocation: None,
            notifications: None,
        }
    }

    pub fn with_document(mut self, document: Document) -> Self {
        self.document = Some(document);
        self
    }

    pub fn with_transport(mut self, transport: impl HttpTransport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    pub fn with_local_store(mut self, store: impl KeyValueStore + 'static) -> Self {
        self.local = Some(Box::new(store));
        self
    }

    pub fn with_session_store(mut self, store: impl KeyValueStore + 'static) -> Self {
        self.session = Some(Box::new(store));
        self
    }

    pub fn with_geolocation(mut self, provider: impl GeolocationProvider + 'static) -> Self {
        self.geolocation = Some(Arc::new(provider));
        self
    }

    pub fn with_notifications(mut self, provider: Arc<dyn NotificationProvider>) -> Self {
        self.notifications = Some(provider);
        self
    }

    pub fn build(self) -> Result<Environment> {
        let config = self.config;
        let memory = || -> Box<dyn KeyValueStore> {
            match config.storage_quota {
                Some(quota) => Box::new(MemoryStore::with_quota(quota)),
                None => Box::new(MemoryStore::new()),
            }
        };

        let local = match (self.local, &config.persistent_store) {
            (Some(store), _) => store,
            (None, Some(path)) => Box::new(JsonFileStore::open(path, config.storage_quota)?),
            (None, None) => memory(),
        };
        let session = self.session.unwrap_or_else(memory);

        let http: Arc<dyn HttpTransport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new(&config)?),
        };

        let random = match config.random_seed {
            Some(seed) => RandomSource::seeded(seed),
            None => RandomSource::new(),
        };

        info!(
            base_url = config.http_base_url.as_ref().map(Url::as_str),
            persistent = config.persistent_store.is_some(),
            seeded = config.random_seed.is_some(),
            "effect environment ready"
        );

        Ok(Environment {
            document: self.document.unwrap_or_default(),
            storage: Storage::new(local, session),
            timers: Timers::new(),
            random,
            frames: FrameQueue::new(),
            http,
            base_url: config.http_base_url.clone(),
            geolocation: self.geolocation,
            notifications: self.notifications,
        })
    }
}

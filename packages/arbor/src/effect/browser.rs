//! Browser capability effects: geolocation and notifications.
//!
//! Capabilities are providers installed on the environment. An environment
//! without a provider reports the capability as unsupported.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{Effect, UnknownFallback};
use crate::error::EffectError;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GeolocationOptions {
    pub enable_high_accuracy: bool,
    pub timeout_ms: Option<u64>,
    pub maximum_age_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "operation", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum BrowserOp {
    Geolocation {
        #[serde(default)]
        options: GeolocationOptions,
    },
    Notification {
        title: String,
        #[serde(default)]
        options: Map<String, Value>,
    },
    #[serde(skip)]
    Unknown { operation: String, payload: Value },
}

impl BrowserOp {
    pub fn operation(&self) -> &str {
        match self {
            BrowserOp::Geolocation { .. } => "geolocation",
            BrowserOp::Notification { .. } => "notification",
            BrowserOp::Unknown { operation, .. } => operation,
        }
    }
}

impl UnknownFallback for BrowserOp {
    fn unknown(operation: String, payload: Value) -> Self {
        BrowserOp::Unknown { operation, payload }
    }
}

pub fn geolocation(options: GeolocationOptions) -> Effect {
    Effect::new(BrowserOp::Geolocation { options })
}

pub fn notification(title: impl Into<String>, options: Map<String, Value>) -> Effect {
    Effect::new(BrowserOp::Notification {
        title: title.into(),
        options,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoPosition {
    pub latitude: f64,
    pub longitude: f64,
    /// Meters.
    pub accuracy: f64,
}

/// A notification that was shown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationHandle {
    pub id: u64,
    pub title: String,
    pub options: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Granted,
    Denied,
    /// Not decided yet; asking is allowed.
    Default,
}

// =============================================================================
// Providers
// =============================================================================

#[async_trait]
pub trait GeolocationProvider: Send + Sync {
    /// `Err` carries the provider's failure message.
    async fn current_position(&self, options: &GeolocationOptions) -> Result<GeoPosition, String>;
}

#[async_trait]
pub trait NotificationProvider: Send + Sync {
    fn permission(&self) -> Permission;

    async fn request_permission(&self) -> Permission;

    async fn show(
        &self,
        title: &str,
        options: &Map<String, Value>,
    ) -> Result<NotificationHandle, String>;
}

/// Answers every request with a fixed position, or a fixed failure.
#[derive(Debug, Clone)]
pub struct FixedLocation {
    result: Result<GeoPosition, String>,
}

impl FixedLocation {
    pub fn at(latitude: f64, longitude: f64, accuracy: f64) -> Self {
        Self {
            result: Ok(GeoPosition {
                latitude,
                longitude,
                accuracy,
            }),
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            result: Err(message.into()),
        }
    }
}

#[async_trait]
impl GeolocationProvider for FixedLocation {
    async fn current_position(&self, _options: &GeolocationOptions) -> Result<GeoPosition, String> {
        self.result.clone()
    }
}

/// Records shown notifications in memory.
#[derive(Debug)]
pub struct MemoryNotifier {
    permission: Mutex<Permission>,
    /// What `request_permission` decides when the permission is `Default`.
    answer: Permission,
    next_id: AtomicU64,
    shown: Mutex<Vec<NotificationHandle>>,
}

impl MemoryNotifier {
    pub fn new(permission: Permission, answer: Permission) -> Self {
        Self {
            permission: Mutex::new(permission),
            answer,
            next_id: AtomicU64::new(1),
            shown: Mutex::new(Vec::new()),
        }
    }

    pub fn granted() -> Self {
        Self::new(Permission::Granted, Permission::Granted)
    }

    pub fn shown(&self) -> Vec<NotificationHandle> {
        self.shown.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl NotificationProvider for MemoryNotifier {
    fn permission(&self) -> Permission {
        *self.permission.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn request_permission(&self) -> Permission {
        let mut permission = self.permission.lock().unwrap_or_else(|e| e.into_inner());
        if *permission == Permission::Default {
            *permission = self.answer;
        }
        *permission
    }

    async fn show(
        &self,
        title: &str,
        options: &Map<String, Value>,
    ) -> Result<NotificationHandle, String> {
        let handle = NotificationHandle {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            title: title.to_string(),
            options: options.clone(),
        };
        self.shown
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(handle.clone());
        Ok(handle)
    }
}

/// Resolve permission, asking once if undecided, then show.
pub(crate) async fn notify(
    provider: &dyn NotificationProvider,
    title: &str,
    options: &Map<String, Value>,
) -> Result<NotificationHandle, EffectError> {
    let permission = match provider.permission() {
        Permission::Default => provider.request_permission().await,
        decided => decided,
    };
    if permission != Permission::Granted {
        return Err(EffectError::Unsupported("Notification permission denied".into()));
    }
    provider.show(title, options).await.map_err(EffectError::Unsupported)
}

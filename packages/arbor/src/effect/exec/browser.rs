use std::sync::Arc;

use crate::effect::browser::{notify, BrowserOp, GeolocationProvider, NotificationProvider};
use crate::effect::{Category, Completion, EffectValue};
use crate::error::EffectError;

/// Always pending, including when the capability is missing.
pub(crate) fn execute(
    geolocation: Option<Arc<dyn GeolocationProvider>>,
    notifications: Option<Arc<dyn NotificationProvider>>,
    op: BrowserOp,
) -> Completion {
    match op {
        BrowserOp::Geolocation { options } => {
            Completion::pending("geolocation", async move {
                let provider = geolocation
                    .ok_or_else(|| EffectError::Unsupported("Geolocation not supported".into()))?;
                provider
                    .current_position(&options)
                    .await
                    .map(EffectValue::Position)
                    .map_err(EffectError::Unsupported)
            })
        }
        BrowserOp::Notification { title, options } => {
            Completion::pending("notification", async move {
                let provider = notifications
                    .ok_or_else(|| EffectError::Unsupported("Notifications not supported".into()))?;
                notify(provider.as_ref(), &title, &options)
                    .await
                    .map(EffectValue::Notification)
            })
        }
        BrowserOp::Unknown { operation, .. } => {
            Completion::Ready(Err(super::unknown(Category::BrowserApi, operation)))
        }
    }
}

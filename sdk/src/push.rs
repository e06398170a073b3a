//! Push-subscription registration.
//!
//! Registration is a chain of awaits across the platform and the server:
//! ask permission, fetch the VAPID key, subscribe, store the subscription.
//! The whole handshake runs under one ceiling and is never retried.

use std::future::Future;
use std::time::Duration;

use tokio::time::timeout;
use tracing::{info, warn};

use crate::client::{ClientError, PushRegistrar};
use crate::types::PushSubscription;

/// Default ceiling for the registration handshake in seconds.
pub const DEFAULT_PUSH_TIMEOUT_SECS: u64 = 10;

/// Outcome of a notification permission prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushPermission {
    /// The user allowed notifications.
    Granted,
    /// The user refused notifications.
    Denied,
    /// The prompt was dismissed.
    Dismissed,
}

/// Push registration errors.
#[derive(Debug, thiserror::Error)]
pub enum PushError {
    /// Push is not available on this platform.
    #[error("push notifications unsupported")]
    Unsupported,

    /// The user did not grant permission.
    #[error("notification permission not granted: {0:?}")]
    PermissionDenied(PushPermission),

    /// The platform failed to subscribe.
    #[error("platform error: {0}")]
    Platform(String),

    /// The server call failed.
    #[error("registration request failed: {0}")]
    Request(#[from] ClientError),

    /// The handshake did not finish within the ceiling.
    #[error("push registration timed out after {0:?}")]
    TimedOut(Duration),
}

/// Platform push service.
pub trait PushPlatform: Send + Sync {
    /// Prompts the user for notification permission.
    fn request_permission(&self) -> impl Future<Output = Result<PushPermission, PushError>> + Send;

    /// Subscribes with the server's VAPID public key.
    fn subscribe(
        &self,
        vapid_public_key: &str,
    ) -> impl Future<Output = Result<PushSubscription, PushError>> + Send;
}

/// Registers this client for push notifications.
///
/// # Errors
///
/// Returns [`PushError::TimedOut`] if the handshake exceeds `ceiling`, or
/// the first error raised along the way.
pub async fn register_push<P, R>(
    platform: &P,
    registrar: &R,
    ceiling: Duration,
) -> Result<PushSubscription, PushError>
where
    P: PushPlatform,
    R: PushRegistrar,
{
    let handshake = async {
        let permission = platform.request_permission().await?;
        if permission != PushPermission::Granted {
            return Err(PushError::PermissionDenied(permission));
        }

        let key = registrar.vapid_public_key().await?;
        let subscription = platform.subscribe(&key).await?;
        registrar.register(&subscription).await?;
        Ok(subscription)
    };

    match timeout(ceiling, handshake).await {
        Ok(Ok(subscription)) => {
            info!(endpoint = %subscription.endpoint, "push subscription registered");
            Ok(subscription)
        }
        Ok(Err(err)) => {
            warn!(error = %err, "push registration failed");
            Err(err)
        }
        Err(_) => {
            warn!(?ceiling, "push registration timed out");
            Err(PushError::TimedOut(ceiling))
        }
    }
}

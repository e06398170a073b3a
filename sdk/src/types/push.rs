//! Push subscription types.

use serde::{Deserialize, Serialize};

/// Encryption keys of a push subscription, base64 encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushKeys {
    /// Client public key.
    pub p256dh: String,

    /// Authentication secret.
    pub auth: String,
}

/// A platform push subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushSubscription {
    /// Push service endpoint.
    pub endpoint: String,

    /// Encryption keys.
    pub keys: PushKeys,
}

//! Delivery-network side of the gateway.
//!
//! - `apns` / `gcm`: wire types and HTTP clients behind `ApnsClient` / `GcmClient`
//! - `ios` / `android`: senders turning a `PushNotification` into provider calls
//! - `registry`: the per-platform sender table used by the dispatcher

pub mod android;
pub mod apns;
pub mod error;
pub mod gcm;
pub mod ios;
pub mod log;
pub mod registry;
pub mod sender;

pub use registry::SenderRegistry;
pub use sender::{ProviderPayload, PushSender, SendReport};

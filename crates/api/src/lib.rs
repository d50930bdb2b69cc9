//! HTTP intake and stat exposition for the push gateway.
//!
//! Endpoints:
//! - `POST /api/push`: enqueue (or, in sync mode, deliver) a batch of notifications
//! - `POST /api/push/single`: deliver one notification on the request task
//! - `GET /api/stat/app`: delivery counters
//! - `DELETE /api/stat/app`: zero the delivery counters
//! - `GET /health`: liveness

pub mod routes;
pub mod state;

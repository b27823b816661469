//! # Recognition Relay
//!
//! Signs an uploaded sample and forwards it to the recognition provider.
//!
//! - **sample**: the request-scoped upload
//! - **signing**: string-to-sign and HMAC-SHA1 signature
//! - **client**: outbound multipart call and response relay

pub mod client;
pub mod sample;
pub mod signing;

pub use client::RecognitionRelay;
pub use sample::{UploadedSample, MAX_SAMPLE_BYTES};
pub use signing::SigningContext;

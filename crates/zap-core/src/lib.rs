//! Zap access and lifecycle controller.
//!
//! [`ZapController`] orchestrates the two operations a zap ever sees:
//!
//! - **create**: validate input, store the file (if any), hash the password,
//!   persist the record under a fresh short code, and render a QR image of the
//!   public short URL
//! - **resolve**: load by short code, run the [`ResolutionGate`], record the
//!   view with a compare-and-swap increment, re-check the limit against the
//!   post-increment count, and hand back either inline bytes or a redirect
//!
//! All collaborators (repository, content store, hasher, QR renderer, code
//! generator) are injected through [`Collaborators`], so tests can swap any
//! of them for doubles.
//!
//! [`ResolutionGate`]: zap_gate::ResolutionGate

pub mod config;
pub mod controller;
pub mod data_url;
pub mod error;
pub mod input;
pub mod qr;

pub use config::ZapConfig;
pub use controller::{
    Collaborators, CreatedZap, ResolveRequest, Resolution, SweepReport, ZapController,
};
pub use data_url::{DataUrl, DataUrlError};
pub use error::{ZapError, ZapResult};
pub use input::{CreateZapInput, FileUpload, NewZap, ZapContent};
pub use qr::{PngQrRenderer, QrError, QrImage, QrRenderer};

//! veriframe - forensic photo verification
//!
//! Runs a fixed set of independent forensic detectors in parallel over a
//! single image (metadata validation, visual/cryptographic watermarks,
//! frequency-domain analysis, face-swap checks, intrinsic pixel analysis)
//! and fuses their reports into one calibrated verdict: `real`,
//! `ai_generated`, `manipulated`, or `inconclusive`.
//!
//! # Example
//! ```no_run
//! use veriframe::{Detail, Engine, Mode};
//!
//! # async fn demo() -> veriframe::Result<()> {
//! let bytes = std::fs::read("photo.jpg")?;
//! let engine = Engine::new();
//! let result = engine.verify(&bytes, Mode::Document, Detail::Basic).await?;
//! println!("{:?} ({:.2})", result.verdict, result.confidence);
//! # Ok(())
//! # }
//! ```

pub mod collaborators;
pub mod config;
pub mod detect;
pub mod dsp;
pub mod engine;
pub mod error;
pub mod exif;
pub mod executor;
pub mod fusion;
pub mod heif;
pub mod icc;
pub mod jpeg;
pub mod loader;
pub mod report;
pub mod request;
pub mod response;

// Re-export the surface most callers need.
pub use engine::Engine;
pub use error::{Error, Result};
pub use report::{Verdict, VerdictStatus};
pub use request::{Detail, Mode, VerifyOptions};
pub use response::VerifyResult;

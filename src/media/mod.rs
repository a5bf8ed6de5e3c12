//! Input acquisition and encoding pipeline.
//!
//! ```text
//! request ──► resolve (one of three shapes ──► two scratch files)
//!                 │
//!                 ▼
//!             encode (ffmpeg child process, bounded wall clock)
//!                 │
//!                 ▼
//!             release inputs unconditionally, publish outcome
//! ```
//!
//! Everything touching the scratch directory is namespaced by a
//! per-request identifier, so concurrent requests never share a path.

pub mod artifact;
pub mod encode;
pub mod resolve;

//! Measurement vocabulary shared by the session core and the simulator.
//!
//! - **types**: measurement types, fitting parameters, curves, requests
//! - **levels**: the discrete input-level grid and slider snapping
//! - **probe**: probe-tube depth classification

pub mod levels;
pub mod probe;
pub mod types;

pub use levels::{snap_level, InputLevel, INPUT_LEVELS};
pub use probe::{ProbePosition, ProbeThresholds};
pub use types::*;

//! # mcqgen-telemetry
//!
//! Logging setup for the quiz generator.
//!
//! [`init_telemetry`] installs a `tracing-subscriber` fmt subscriber filtered
//! by `RUST_LOG` (default `info`). Set `MCQGEN_LOG_FORMAT=json` for JSON lines.
//! [`EventCapture`] records events in memory so tests can assert on logging.

pub mod capture;
pub mod init;

pub use capture::{CaptureLayer, CapturedEvent, EventCapture};
pub use init::{LogFormat, TelemetryError, init_telemetry, init_with_format};

// Re-export tracing for convenience
pub use tracing::{debug, error, info, instrument, trace, warn};

//! Directory conversion behind the `fhir-mapper` binary.

pub mod config;
pub mod convert;
pub mod logging;

pub use config::FileConfig;
pub use convert::{convert_directory, FileReport, RunSummary};
pub use logging::{init_logging, LogConfig, LogFormat};

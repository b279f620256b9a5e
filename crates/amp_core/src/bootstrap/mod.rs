//! Local environment provisioning.
//!
//! Builds the Python virtual environment the service runs from:
//! interpreter discovery, venv creation, installer upgrade, dependency
//! installation. Stages run strictly in order and any failure aborts
//! the run; a stamp file records the installed manifest digest so an
//! unchanged re-run is a no-op.
//!
//! # Example
//!
//! ```no_run
//! use amp_core::bootstrap::EnvBuilder;
//! use amp_core::logging::RunLogger;
//! use std::path::Path;
//!
//! let logger = RunLogger::new("setup", Path::new(".amp/logs")).unwrap();
//! let report = EnvBuilder::new("requirements.txt", ".venv")
//!     .run(&logger)
//!     .unwrap();
//! println!("installed {} packages", report.package_count);
//! ```

mod builder;
mod paths;

pub use builder::{EnvBuilder, EnvReport, PackageIndex, SetupError, SetupResult};
pub use paths::{discover_interpreter, EnvPaths};

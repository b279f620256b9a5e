//! The concrete build stages, in their canonical order.
//!
//! [`crate::image::standard_assembler`] wires these together; each one
//! can also be combined manually through [`crate::image::Assembler`].

mod base;
mod dependencies;
mod entrypoint;
mod runtime;
mod session_dir;
mod source;
mod system_packages;

pub use base::BaseStage;
pub use dependencies::DependenciesStage;
pub use entrypoint::EntrypointStage;
pub use runtime::RuntimeStage;
pub use session_dir::SessionDirStage;
pub use source::SourceStage;
pub use system_packages::SystemPackagesStage;

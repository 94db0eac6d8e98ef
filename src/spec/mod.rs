//! Workload spec documents and loading.

mod document;
mod loader;

pub use document::{SpecDocument, WorkloadKind};
pub use loader::SpecLoader;

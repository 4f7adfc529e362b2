//! Module graph: `go.mod` manifests, versions and import-path ownership.

pub mod manifest;
pub mod resolver;
pub mod version;

pub use manifest::{MANIFEST_FILE, Manifest, ReplaceTarget, Replacement, Requirement};
pub use resolver::{Module, ModuleResolver};
pub use version::ModVersion;

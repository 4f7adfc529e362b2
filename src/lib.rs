#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

//! Semantic model builder for Go application trees.
//!
//! An [`Analysis`] resolves which module owns each import path, loads
//! packages on demand (each at most once), classifies every identifier of a
//! file, and turns type syntax into the [`schema::Type`] model.

pub mod analysis;
pub mod build_info;
pub mod cancel;
pub mod diagnostics;
pub mod error;
pub mod frontend;
pub mod loader;
pub mod logging;
pub mod module;
pub mod names;
pub mod paths;
pub mod scanner;
pub mod schema;

pub use analysis::Analysis;
pub use build_info::BuildInfo;
pub use error::{Error, Result};
pub use paths::{FsPath, ModPath, PkgPath, QualifiedName};

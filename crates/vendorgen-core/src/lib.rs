//! vendorgen-core: build-introspection driven cgo wrapper generation
//!
//! This crate turns the upstream source trees of zlib, libevent, OpenSSL and
//! Tor into a self-contained Go package:
//!
//! - **Acquisition**: clone each library at a pinned or policy-selected revision
//! - **Introspection**: configure it and scrape `make --dry-run` for the exact
//!   set of compiled sources
//! - **Pruning**: reduce the tree to headers, sources and the license
//! - **Generation**: one cgo wrapper per compilation unit, a preamble per
//!   library, and the per-architecture config headers
//! - **Ledger**: `lock.json` pins every revision so runs can be replayed
//!
//! [`Orchestrator`] sequences all of it; native tools are reached through
//! [`vendorgen_native::CommandRunner`].

pub mod acquire;
pub mod codegen;
pub mod config;
pub mod error;
pub mod headers;
pub mod introspect;
pub mod ledger;
pub mod library;
pub mod pipeline;
pub mod platform;
pub mod prune;
pub mod telemetry;
pub mod template;

pub use acquire::{Acquired, SourceAcquirer};
pub use codegen::GeneratedWrapper;
pub use config::{GeneratorConfig, RunMode, HOMEBREW_PREFIX};
pub use error::{Result, Stage, VendorError};
pub use headers::{ConfigArtifact, HeaderEntry, HeaderMode};
pub use introspect::{extract_units, CompilationUnit, ExtractionRules, VersionInfo};
pub use ledger::{LedgerBuilder, VersionLedger};
pub use library::{Library, LibrarySpec, RevisionPolicy};
pub use pipeline::{LibraryOutcome, Orchestrator, RunReport};
pub use platform::{ArchVariant, PlatformGroup};
pub use prune::{PruneReport, PruneRules};
pub use telemetry::init_tracing;

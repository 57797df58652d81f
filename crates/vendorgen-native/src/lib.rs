//! vendorgen-native: the boundary between vendorgen and native build tools
//!
//! Everything that spawns a process lives behind [`CommandRunner`]: git for
//! fetching upstream trees, and the autotools/make invocations used to
//! introspect a library's build. Production code uses [`ProcessRunner`];
//! tests swap in [`fakes::ScriptedRunner`] and feed captured build logs.

pub mod error;
pub mod fakes;
pub mod git;
pub mod invocation;
pub mod runner;

pub use error::NativeError;
pub use git::Git;
pub use invocation::Invocation;
pub use runner::{CommandOutput, CommandRunner, ProcessRunner};

/// Result type for native tool operations
pub type Result<T> = std::result::Result<T, NativeError>;

/// Whether `program` can be found on `PATH`.
pub fn is_available(program: &str) -> bool {
    std::process::Command::new(program)
        .arg("--version")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

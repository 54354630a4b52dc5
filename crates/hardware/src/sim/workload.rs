//! Workload replication.
//!
//! A workload is the program one hardware thread executes: an executable, its arguments,
//! and its environment. This module provides:
//! 1. **Construction:** Builder-style setters for arguments and environment variables.
//! 2. **OpenMP placement:** The thread-count and binding variables for a machine.
//! 3. **Replication:** One identical copy per hardware thread of a core.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// The program one hardware thread executes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workload {
    binary: PathBuf,
    args: Vec<String>,
    env: BTreeMap<String, String>,
}

impl Workload {
    /// Creates a workload running `binary` with no arguments and an empty environment.
    pub fn new(binary: impl AsRef<Path>) -> Self {
        Self {
            binary: binary.as_ref().to_path_buf(),
            args: Vec::new(),
            env: BTreeMap::new(),
        }
    }

    /// Appends command-line arguments.
    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Sets one environment variable, replacing any previous value.
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let _ = self.env.insert(key.into(), value.into());
        self
    }

    /// Sets `OMP_NUM_THREADS`, `OMP_PROC_BIND=spread`, and `OMP_PLACES=cores`.
    ///
    /// # Arguments
    ///
    /// * `total_threads` - Hardware threads across the whole machine.
    #[must_use]
    pub fn with_openmp(self, total_threads: usize) -> Self {
        self.with_env("OMP_NUM_THREADS", total_threads.to_string())
            .with_env("OMP_PROC_BIND", "spread")
            .with_env("OMP_PLACES", "cores")
    }

    /// Executable path.
    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Arguments after the executable.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Environment variables, sorted by name.
    pub const fn env(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    /// Full command line: the executable followed by its arguments.
    pub fn command(&self) -> Vec<String> {
        std::iter::once(self.binary.display().to_string())
            .chain(self.args.iter().cloned())
            .collect()
    }

    /// Environment as `KEY=VALUE` strings.
    pub fn env_list(&self) -> Vec<String> {
        self.env.iter().map(|(k, v)| format!("{k}={v}")).collect()
    }

    /// One copy per hardware thread.
    pub fn replicate(&self, threads: usize) -> Vec<Self> {
        vec![self.clone(); threads]
    }
}

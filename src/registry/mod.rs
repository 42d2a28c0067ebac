// src/registry/mod.rs

//! Backend registration and startup selection.
//!
//! Backends are registered once, in precedence order. `select_active` walks
//! them in that order and builds the active set: at most one graphical
//! backend plus every text backend that detects and initializes. The active
//! set is fixed for the rest of the process and shut down in reverse.

use crate::backends::Backend;
use crate::config::Config;
use crate::error::DisplayError;
use log::{debug, info, warn};

/// Lifecycle of one registered backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendState {
    /// Registered but not part of the active set.
    #[default]
    Unregistered,
    /// `detect` succeeded; initialization pending.
    Detected,
    Active,
    ShutDown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendDescriptor {
    pub name: String,
    pub is_graphical: bool,
    pub state: BackendState,
}

struct Candidate {
    descriptor: BackendDescriptor,
    backend: Box<dyn Backend>,
}

/// An initialized backend in the active set.
pub struct ActiveBackend {
    pub descriptor: BackendDescriptor,
    pub backend: Box<dyn Backend>,
}

#[derive(Default)]
pub struct BackendRegistry {
    candidates: Vec<Candidate>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `backend` to the precedence list.
    pub fn register(&mut self, backend: Box<dyn Backend>) -> Result<(), DisplayError> {
        let name = backend.name().to_string();
        if self.candidates.iter().any(|c| c.descriptor.name == name) {
            return Err(DisplayError::DuplicateBackendName(name));
        }
        debug!("Registered display backend '{}'", name);
        self.candidates.push(Candidate {
            descriptor: BackendDescriptor {
                name,
                is_graphical: backend.is_graphical(),
                state: BackendState::Unregistered,
            },
            backend,
        });
        Ok(())
    }

    pub fn descriptors(&self) -> Vec<BackendDescriptor> {
        self.candidates.iter().map(|c| c.descriptor.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Detects and initializes candidates in precedence order, moving the
    /// successful ones into the returned set. Candidates that were skipped or
    /// failed stay in the registry as `Unregistered`.
    pub fn select_active(&mut self, config: &Config) -> Result<ActiveSet, DisplayError> {
        let mut active = ActiveSet::default();
        let mut remaining = Vec::with_capacity(self.candidates.len());

        for mut candidate in self.candidates.drain(..) {
            let name = candidate.descriptor.name.clone();
            if !candidate.backend.detect(config) {
                debug!("Display backend '{}' not available", name);
                remaining.push(candidate);
                continue;
            }
            if candidate.descriptor.is_graphical && active.has_graphical() {
                debug!("Skipping graphical backend '{}': one is already active", name);
                remaining.push(candidate);
                continue;
            }

            candidate.descriptor.state = BackendState::Detected;
            match candidate.backend.initialize(config) {
                Ok(()) => {
                    info!("Display backend '{}' active", name);
                    candidate.descriptor.state = BackendState::Active;
                    active.entries.push(ActiveBackend {
                        descriptor: candidate.descriptor,
                        backend: candidate.backend,
                    });
                }
                Err(e) => {
                    warn!("Display backend '{}' failed to initialize: {:#}", name, e);
                    if let Err(e) = candidate.backend.shutdown() {
                        debug!("Shutdown after failed initialize of '{}': {:#}", name, e);
                    }
                    candidate.descriptor.state = BackendState::Unregistered;
                    remaining.push(candidate);
                }
            }
        }
        self.candidates = remaining;

        if active.is_empty() {
            return Err(DisplayError::NoBackendAvailable);
        }
        info!("Active display backends: {:?}", active.names());
        Ok(active)
    }
}

/// The backends selected at startup, in activation order.
#[derive(Default)]
pub struct ActiveSet {
    entries: Vec<ActiveBackend>,
}

impl ActiveSet {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn has_graphical(&self) -> bool {
        self.entries.iter().any(|e| e.descriptor.is_graphical)
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.descriptor.name.as_str()).collect()
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &BackendDescriptor> {
        self.entries.iter().map(|e| &e.descriptor)
    }

    pub fn entries_mut(&mut self) -> &mut [ActiveBackend] {
        &mut self.entries
    }

    /// Shuts every backend down in reverse activation order and empties the
    /// set. Failures are logged and do not stop the remaining shutdowns.
    pub fn shutdown(&mut self) {
        while let Some(mut entry) = self.entries.pop() {
            if let Err(e) = entry.backend.shutdown() {
                warn!("Display backend '{}' failed to shut down: {:#}", entry.descriptor.name, e);
            }
            entry.descriptor.state = BackendState::ShutDown;
            debug!("Display backend '{}': {:?}", entry.descriptor.name, entry.descriptor.state);
        }
    }
}

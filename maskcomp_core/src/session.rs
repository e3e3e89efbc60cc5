// Copyright 2026 the Maskcomp Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Owned connection to the compositor runtime.
//!
//! A [`Session`] is created once at startup and dropped last. Everything
//! else (view, scene, tracker, logic) borrows it for its whole lifetime, so
//! the borrow checker enforces the teardown order. `Session` is not `Clone`.

use core::cell::{Cell, RefCell};

use tracing::{debug, error};

use crate::runtime::{Runtime, RuntimeError};
use crate::time::HostTime;

/// The runtime could not be reached when opening the session.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("creating runtime session failed: {0}")]
pub struct SessionInitError(#[from] pub RuntimeError);

/// Connection to the compositor runtime.
#[derive(Debug)]
pub struct Session {
    runtime: Box<dyn Runtime>,
    valid: Cell<bool>,
    last_error: RefCell<Option<RuntimeError>>,
}

impl Session {
    /// Opens a session on `runtime`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionInitError`] if the runtime is not running.
    pub fn init(runtime: Box<dyn Runtime>) -> Result<Self, SessionInitError> {
        debug!("initializing runtime session");
        runtime.session_init()?;
        Ok(Self {
            runtime,
            valid: Cell::new(true),
            last_error: RefCell::new(None),
        })
    }

    /// Whether the session is connected.
    #[inline]
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.valid.get()
    }

    /// The underlying runtime.
    #[inline]
    #[must_use]
    pub fn runtime(&self) -> &dyn Runtime {
        &*self.runtime
    }

    /// Current time on the runtime clock, in nanoseconds.
    #[must_use]
    pub fn current_time(&self) -> HostTime {
        self.runtime.current_time()
    }

    /// Returns and clears the last recorded error message.
    ///
    /// The string is empty when no call has failed since the previous read.
    #[must_use]
    pub fn error(&self) -> String {
        self.last_error
            .borrow_mut()
            .take()
            .map(|e| e.to_string())
            .unwrap_or_default()
    }

    /// Routes the result of a runtime call: errors are logged, recorded as
    /// the last error and turned into `None`.
    pub fn check<T>(&self, what: &str, result: Result<T, RuntimeError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                self.record(what, err);
                None
            }
        }
    }

    /// Logs `err` and records it as the last error.
    pub fn record(&self, what: &str, err: RuntimeError) {
        error!(call = what, code = err.code, "{}", err.message);
        *self.last_error.borrow_mut() = Some(err);
    }

    /// Shuts the session down. Dropping a valid session does the same.
    pub fn shutdown(&mut self) {
        if self.valid.replace(false) {
            debug!("shutting down runtime session");
            self.runtime.shutdown();
        }
    }
}

impl AsRef<dyn Runtime> for Session {
    fn as_ref(&self) -> &(dyn Runtime + 'static) {
        &*self.runtime
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.shutdown();
    }
}

//! Helpers for exposing the crate across a language boundary.

use crate::{Error, Result};
use std::panic;
use std::sync::Once;

static INIT: Once = Once::new();

/// Process-wide setup for embedding applications.
///
/// Installs a panic hook that reports panics through `tracing` before handing them to
/// the previously installed hook. Calling it again is a no-op.
pub fn init() -> Result<()> {
    INIT.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            tracing::error!(panic = %info, "panic in smview");
            previous(info);
        }));
        tracing::debug!("installed panic hook");
    });
    Ok(())
}

/// An out-of-band error report.
///
/// Adapters hand one record to every fallible call so that an unchecked failure
/// is still visible afterwards through `failed`.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct ErrorRecord {
    pub message: String,
    pub failed: bool,
    /// see [Error::code].
    pub code: i32,
}

impl ErrorRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the outcome of `result` and passes its value through.
    ///
    /// A success clears any earlier failure.
    pub fn capture<T>(&mut self, result: Result<T>) -> Option<T> {
        match result {
            Ok(value) => {
                self.clear();
                Some(value)
            }
            Err(err) => {
                *self = Self::from(&err);
                tracing::debug!(code = self.code, error = %err, "captured error");
                None
            }
        }
    }

    pub fn clear(&mut self) {
        self.message.clear();
        self.failed = false;
        self.code = 0;
    }
}

impl From<&Error> for ErrorRecord {
    fn from(err: &Error) -> Self {
        Self {
            message: err.to_string(),
            failed: true,
            code: err.code(),
        }
    }
}

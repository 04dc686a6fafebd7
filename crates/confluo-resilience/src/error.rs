// SPDX-FileCopyrightText: 2026 Confluo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by [`CircuitBreaker::execute`](crate::CircuitBreaker::execute).

use std::time::Duration;

use confluo_core::ConfluoError;

/// Why a guarded call did not produce a value.
#[derive(Debug, thiserror::Error)]
pub enum BreakerError<E> {
    /// The breaker refused the call without running the action.
    #[error("circuit open for {name}")]
    Open { name: String },

    /// The action did not settle within the configured timeout.
    #[error("{name} timed out after {timeout:?}")]
    Timeout { name: String, timeout: Duration },

    /// The action itself failed.
    #[error(transparent)]
    Inner(E),
}

impl<E> BreakerError<E> {
    /// The action's own error, if that is what this is.
    pub fn into_inner(self) -> Option<E> {
        match self {
            BreakerError::Inner(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, BreakerError::Open { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, BreakerError::Timeout { .. })
    }
}

impl From<BreakerError<ConfluoError>> for ConfluoError {
    fn from(err: BreakerError<ConfluoError>) -> Self {
        match err {
            BreakerError::Open { name } => ConfluoError::CircuitOpen { dependency: name },
            BreakerError::Timeout { timeout, .. } => ConfluoError::Timeout { duration: timeout },
            BreakerError::Inner(e) => e,
        }
    }
}

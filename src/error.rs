//! Error types used by the streamer runtime, its collaborators and setup.
//!
//! - [`SetupError`]: construction failures; fatal, the streamer never exists.
//! - [`RuntimeError`]: lifecycle failures (double start, shutdown grace).
//! - [`TickError`]: a tick that could not evaluate (observer missing).
//! - [`TransitionError`]: a load/unload that was refused before it started.
//! - [`ContentError`]: failures reported by the external content loader.
//!
//! Every enum exposes `as_label()` for logs/metrics.

use std::time::Duration;
use thiserror::Error;

use crate::world::{LocationId, LocationState};

/// # Errors raised while building a streamer.
///
/// These are fatal: the builder returns them instead of a streamer, so a
/// misconfigured streamer can never be started.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SetupError {
    /// Two locations were registered with the same id.
    #[error("duplicate location id: {id}")]
    DuplicateId {
        /// The repeated id.
        id: LocationId,
    },

    /// Configuration rejected by [`StreamerConfig::validate`](crate::StreamerConfig::validate).
    #[error("invalid configuration: {reason}")]
    InvalidConfiguration {
        /// What is wrong with it.
        reason: String,
    },

    /// A required collaborator was not supplied to the builder.
    #[error("missing collaborator: {what}")]
    MissingCollaborator {
        /// Which one (`observer` or `loader`).
        what: &'static str,
    },
}

impl SetupError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use worldstream::SetupError;
    ///
    /// let err = SetupError::MissingCollaborator { what: "loader" };
    /// assert_eq!(err.as_label(), "setup_missing_collaborator");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            SetupError::DuplicateId { .. } => "setup_duplicate_id",
            SetupError::InvalidConfiguration { .. } => "setup_invalid_configuration",
            SetupError::MissingCollaborator { .. } => "setup_missing_collaborator",
        }
    }
}

/// # Errors produced by the streamer lifecycle.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// `start()` was called while the tick loop is already running.
    #[error("streamer is already running")]
    AlreadyRunning,

    /// Outstanding transitions did not settle within the grace period.
    #[error("shutdown grace {grace:?} exceeded; still in flight: {stuck:?}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Locations whose transition was still outstanding.
        stuck: Vec<LocationId>,
    },

    /// Registering the OS signal listeners failed.
    #[error("signal listener failed: {0}")]
    Signal(#[from] std::io::Error),
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::AlreadyRunning => "runtime_already_running",
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
            RuntimeError::Signal(_) => "runtime_signal",
        }
    }
}

/// # Reasons a tick performed no work.
#[non_exhaustive]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickError {
    /// The observer source had no position; distances were left untouched.
    #[error("observer position unavailable")]
    ObserverUnavailable,

    /// Called outside a tokio runtime; nothing was evaluated or marked.
    #[error("no tokio runtime to run transitions on")]
    NoRuntime,
}

impl TickError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            TickError::ObserverUnavailable => "tick_observer_unavailable",
            TickError::NoRuntime => "tick_no_runtime",
        }
    }
}

/// # Refusals from `begin_load` / `begin_unload`.
///
/// None of these change any state.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    /// A transition for this location is still outstanding.
    ///
    /// Expected race between a tick and a slow completion; callers ignore it.
    #[error("transition already in flight for {id}")]
    AlreadyInFlight {
        /// The busy location.
        id: LocationId,
    },

    /// The location is not in the state the transition starts from.
    #[error("location {id} is {state}, transition not applicable")]
    NotEligible {
        /// The location.
        id: LocationId,
        /// Its current state.
        state: LocationState,
    },

    /// No location is registered under this id.
    #[error("unknown location: {id}")]
    UnknownLocation {
        /// The id that was looked up.
        id: LocationId,
    },

    /// Called outside a tokio runtime; the slot was left untouched.
    #[error("no tokio runtime to run the transition for {id}")]
    NoRuntime {
        /// The location that was not started.
        id: LocationId,
    },
}

impl TransitionError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            TransitionError::AlreadyInFlight { .. } => "transition_already_in_flight",
            TransitionError::NotEligible { .. } => "transition_not_eligible",
            TransitionError::UnknownLocation { .. } => "transition_unknown_location",
            TransitionError::NoRuntime { .. } => "transition_no_runtime",
        }
    }

    /// True for the in-flight race, which the tick treats as a no-op.
    pub fn is_race(&self) -> bool {
        matches!(self, TransitionError::AlreadyInFlight { .. })
    }
}

/// # Failures reported by a [`ContentLoader`](crate::ContentLoader).
///
/// The core never retries these; the location falls back to its last stable
/// state and is reconsidered on the next tick.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContentError {
    /// Content could not be loaded.
    #[error("load failed: {reason}")]
    Load {
        /// Loader-provided message.
        reason: String,
    },

    /// Content could not be released; the handle stays with the location.
    #[error("unload failed: {reason}")]
    Unload {
        /// Loader-provided message.
        reason: String,
    },
}

impl ContentError {
    /// Shorthand for [`ContentError::Load`].
    pub fn load(reason: impl Into<String>) -> Self {
        ContentError::Load {
            reason: reason.into(),
        }
    }

    /// Shorthand for [`ContentError::Unload`].
    pub fn unload(reason: impl Into<String>) -> Self {
        ContentError::Unload {
            reason: reason.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use worldstream::ContentError;
    ///
    /// assert_eq!(ContentError::load("missing asset").as_label(), "content_load_failed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ContentError::Load { .. } => "content_load_failed",
            ContentError::Unload { .. } => "content_unload_failed",
        }
    }

    /// Returns the loader-provided message.
    pub fn reason(&self) -> &str {
        match self {
            ContentError::Load { reason } | ContentError::Unload { reason } => reason,
        }
    }
}

/// Best-effort text of a caught panic payload.
pub(crate) fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_stable() {
        let id = LocationId::from("harbor");
        assert_eq!(
            SetupError::DuplicateId { id: id.clone() }.as_label(),
            "setup_duplicate_id"
        );
        assert_eq!(TickError::ObserverUnavailable.as_label(), "tick_observer_unavailable");
        assert_eq!(
            TransitionError::AlreadyInFlight { id }.as_label(),
            "transition_already_in_flight"
        );
        assert_eq!(ContentError::unload("busy").as_label(), "content_unload_failed");
    }

    #[test]
    fn only_in_flight_is_a_race() {
        let id = LocationId::from("harbor");
        assert!(TransitionError::AlreadyInFlight { id: id.clone() }.is_race());
        assert!(
            !TransitionError::NotEligible {
                id,
                state: LocationState::Loaded
            }
            .is_race()
        );
    }

    #[test]
    fn content_error_keeps_reason() {
        let err = ContentError::load("prefab missing");
        assert_eq!(err.reason(), "prefab missing");
        assert_eq!(err.to_string(), "load failed: prefab missing");
    }
}

//! Status transition guard
//!
//! A status enum describes its own adjacency table by implementing
//! [`Lifecycle`]. [`is_valid_transition`] is the only check the repository
//! runs before a status-changing write, and it never touches storage.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A finite set of statuses with a static transition table
pub trait Lifecycle:
    Copy + Eq + fmt::Debug + fmt::Display + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Statuses reachable in one step from `self`, excluding `self`
    fn allowed_transitions(self) -> &'static [Self];

    /// No status is reachable from here
    fn is_terminal(self) -> bool {
        self.allowed_transitions().is_empty()
    }
}

/// Whether `current -> proposed` is legal; staying put always is
pub fn is_valid_transition<S: Lifecycle>(current: S, proposed: S) -> bool {
    current == proposed || current.allowed_transitions().contains(&proposed)
}

/// Status type for entities without a lifecycle
///
/// Uninhabited, so an entity using it can never report a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoStatus {}

impl fmt::Display for NoStatus {
    fn fmt(&self, _f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {}
    }
}

impl Lifecycle for NoStatus {
    fn allowed_transitions(self) -> &'static [Self] {
        match self {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    enum Door {
        Open,
        Closed,
        Welded,
    }

    impl fmt::Display for Door {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{:?}", self)
        }
    }

    impl Lifecycle for Door {
        fn allowed_transitions(self) -> &'static [Self] {
            match self {
                Door::Open => &[Door::Closed],
                Door::Closed => &[Door::Open, Door::Welded],
                Door::Welded => &[],
            }
        }
    }

    #[test]
    fn test_table_is_consulted() {
        assert!(is_valid_transition(Door::Open, Door::Closed));
        assert!(is_valid_transition(Door::Closed, Door::Welded));
        assert!(!is_valid_transition(Door::Open, Door::Welded));
        assert!(!is_valid_transition(Door::Welded, Door::Open));
    }

    #[test]
    fn test_same_status_is_always_valid() {
        assert!(is_valid_transition(Door::Welded, Door::Welded));
        assert!(Door::Welded.is_terminal());
        assert!(!Door::Open.is_terminal());
    }
}

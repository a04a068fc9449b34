//! The per-node lifecycle state machine.

use std::fmt;

/// Where a node sits in its own lifecycle.
///
/// Transitions: `Create` → [`SoleMember`](NodeState::SoleMember); `Join` →
/// [`Joining`](NodeState::Joining) → [`Member`](NodeState::Member) on the
/// first successful stabilize round; `Member` →
/// [`PredecessorUnknown`](NodeState::PredecessorUnknown) when
/// check-predecessor finds the predecessor dead; `PredecessorUnknown` →
/// `Member` on the next successful `Notify`. There is no terminal state —
/// node exit is external to this state machine.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum NodeState {
    Uninitialized,
    SoleMember,
    Joining,
    Member,
    PredecessorUnknown,
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            NodeState::Uninitialized => "uninitialized",
            NodeState::SoleMember => "sole member",
            NodeState::Joining => "joining",
            NodeState::Member => "member",
            NodeState::PredecessorUnknown => "predecessor unknown",
        };
        write!(f, "{}", name)
    }
}

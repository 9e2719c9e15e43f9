//! Errors for list, barrier, and counter construction and misuse.

use std::error::Error;
use std::fmt;

/// Errors returned by the synchronization structures.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SyncError {
    /// A barrier needs at least one participant.
    ZeroParticipants,
    /// Tree fan-out below two cannot reduce to a root.
    FanoutTooSmall {
        /// The rejected fan-out.
        child_count: usize,
    },
    /// A striped counter needs at least one stripe.
    ZeroStripes,
    /// A striped counter stage must count at least one hit.
    ZeroStageSize,
    /// More nodes than the 32-bit link encoding can address.
    CapacityTooLarge {
        /// Requested node count.
        requested: usize,
        /// Largest supported node count.
        max: usize,
    },
    /// Node index past the end of the list's node table.
    NodeOutOfRange {
        /// The offending index.
        index: usize,
        /// Nodes in the table.
        capacity: usize,
    },
    /// `add` on a node that is already linked.
    AlreadyLinked {
        /// The node.
        index: usize,
    },
    /// `remove` on a node that is not linked.
    NotLinked {
        /// The node.
        index: usize,
    },
    /// Participant index not covered by the barrier.
    ParticipantOutOfRange {
        /// The offending participant.
        participant: usize,
        /// Participants the barrier was built for.
        participants: usize,
    },
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroParticipants => write!(f, "barrier needs at least one participant"),
            Self::FanoutTooSmall { child_count } => {
                write!(f, "tree fan-out {child_count} is below 2")
            }
            Self::ZeroStripes => write!(f, "striped counter needs at least one stripe"),
            Self::ZeroStageSize => write!(f, "striped counter stage size must be non-zero"),
            Self::CapacityTooLarge { requested, max } => {
                write!(f, "requested {requested} nodes, at most {max} supported")
            }
            Self::NodeOutOfRange { index, capacity } => {
                write!(f, "node {index} out of range for {capacity} nodes")
            }
            Self::AlreadyLinked { index } => write!(f, "node {index} is already linked"),
            Self::NotLinked { index } => write!(f, "node {index} is not linked"),
            Self::ParticipantOutOfRange {
                participant,
                participants,
            } => {
                write!(
                    f,
                    "participant {participant} out of range for a barrier of {participants}"
                )
            }
        }
    }
}

impl Error for SyncError {}

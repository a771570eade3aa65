//! Effects produced by state transitions

use crate::backend::SymptomEntry;
use std::time::Duration;

/// Effects to be executed after state transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Send a user utterance to the remote session service
    RequestReply { epoch: u64, text: String },

    /// Hand the finished entry to the persistence collaborator
    PersistSession { epoch: u64, entry: SymptomEntry },

    /// Return to the initial stage after `delay` unless cancelled
    ScheduleAutoReset { epoch: u64, delay: Duration },

    /// Drop any pending auto-reset
    CancelAutoReset,

    /// Publish the new state to subscribers
    PublishState,
}

//! Driver state as explicit values.
//!
//! ```text
//! Stopped --start--> Started { medium: Changed, lock: Unlocked }
//!
//! Started { medium: Changed }  --READ CAPACITY ok-->   Started { medium: Ready(capacity) }
//! Started { medium: Changed }  --READ CAPACITY err-->  Started { medium: Changed }
//! Started { medium: Ready(_) } --eject / unit attention--> Started { medium: Changed }
//!
//! Started { lock: Unlocked } <--lock / unlock--> Started { lock: Locked }
//!
//! Started { .. } --stop--> Stopped
//! ```

use strata_scsi::CapacityData;

/// Whether the cached capacity can be trusted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MediumState {
    /// The medium may have changed; the next capacity consumer refreshes.
    Changed,
    /// Capacity was read since the last change.
    Ready(CapacityData),
}

/// Medium removal sub-state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LockState {
    Unlocked,
    Locked,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DriverState {
    Stopped,
    Started { medium: MediumState, lock: LockState },
}

impl DriverState {
    /// The state right after `start()`.
    pub fn started() -> Self {
        DriverState::Started {
            medium: MediumState::Changed,
            lock: LockState::Unlocked,
        }
    }

    pub fn is_started(&self) -> bool {
        matches!(self, DriverState::Started { .. })
    }

    /// Cached capacity, if the medium is ready.
    pub fn capacity(&self) -> Option<&CapacityData> {
        match self {
            DriverState::Started {
                medium: MediumState::Ready(capacity),
                ..
            } => Some(capacity),
            _ => None,
        }
    }

    pub fn is_changed(&self) -> bool {
        matches!(
            self,
            DriverState::Started {
                medium: MediumState::Changed,
                ..
            }
        )
    }

    pub fn lock_state(&self) -> Option<LockState> {
        match self {
            DriverState::Started { lock, .. } => Some(*lock),
            DriverState::Stopped => None,
        }
    }
}

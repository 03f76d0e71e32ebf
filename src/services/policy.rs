use crate::config::PersistMode;
use crate::domain::storage::StateStore;
use crate::error::Result;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    NotifyExtractionFailure,
    NotifyChange { is_first_observation: bool },
    NotifyManualNoChange,
    Skip,
}

impl Decision {
    pub fn notifies(&self) -> bool {
        !matches!(self, Decision::Skip)
    }
}

/// Pure change detection over the opaque timestamp token.
pub fn decide(current: Option<&str>, last: &str, manual: bool) -> Decision {
    match current {
        None => Decision::NotifyExtractionFailure,
        Some(current) if current != last => Decision::NotifyChange {
            is_first_observation: last.is_empty(),
        },
        Some(_) if manual => Decision::NotifyManualNoChange,
        Some(_) => Decision::Skip,
    }
}

/// Couples [`decide`] with the persisted state. Only a change ever writes,
/// and only once per poll.
pub struct NotificationPolicy<'a> {
    store: &'a dyn StateStore,
    mode: PersistMode,
}

impl<'a> NotificationPolicy<'a> {
    pub fn new(store: &'a dyn StateStore, mode: PersistMode) -> Self {
        Self { store, mode }
    }

    pub fn last_seen(&self) -> Result<String> {
        self.store.read_last()
    }

    /// Decides against the stored value and, in after-decision mode, advances it.
    pub fn evaluate(&self, current: Option<&str>, last: &str, manual: bool) -> Result<Decision> {
        let decision = decide(current, last, manual);
        debug!("Last stored {:?}, current {:?} -> {:?}", last, current, decision);

        if self.mode == PersistMode::AfterDecision {
            self.advance(decision, current)?;
        }
        Ok(decision)
    }

    /// Called once the message went out (or failed to).
    pub fn delivered(&self, decision: Decision, current: Option<&str>, sent: bool) -> Result<()> {
        match self.mode {
            PersistMode::AfterDecision => {
                if !sent && decision.notifies() {
                    warn!("Notification failed; state already advanced, no re-alert next poll");
                }
                Ok(())
            }
            PersistMode::AfterDelivery if sent => self.advance(decision, current),
            PersistMode::AfterDelivery => {
                if let Decision::NotifyChange { .. } = decision {
                    warn!("Notification failed; keeping previous state so the next poll retries");
                }
                Ok(())
            }
        }
    }

    fn advance(&self, decision: Decision, current: Option<&str>) -> Result<()> {
        if let (Decision::NotifyChange { .. }, Some(current)) = (decision, current) {
            self.store.write_last(current)?;
            info!("Stored new last record {:?}", current);
        }
        Ok(())
    }
}

use hourglass_rs::SafeTimeProvider;
use tracing::info;

use crate::errors::{LedgerError, Result};
use crate::events::{Event, EventStore};
use crate::store::LedgerStore;
use crate::types::{EntryId, PaymentStatus};

/// back-office audit step of the two-step collection workflow
///
/// front-desk entries land `pending`; this engine confirms them in bulk.
/// pending → approved is the only transition; entries in any other status
/// pass through untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApprovalEngine;

impl ApprovalEngine {
    pub fn new() -> Self {
        Self
    }

    /// approve every pending entry in `ids`; returns how many changed
    pub fn approve<L>(
        &self,
        ids: &[EntryId],
        ledger: &mut L,
        time: &SafeTimeProvider,
        events: &mut EventStore,
    ) -> Result<u32>
    where
        L: LedgerStore,
    {
        let approved_at = time.now();
        let count = ledger.update_status(ids, PaymentStatus::Approved, approved_at)?;
        if count == 0 {
            return Err(LedgerError::NoPendingRows);
        }

        info!("approved {} of {} submitted entries", count, ids.len());
        events.emit(Event::EntriesApproved {
            count,
            timestamp: approved_at,
        });
        Ok(count)
    }
}

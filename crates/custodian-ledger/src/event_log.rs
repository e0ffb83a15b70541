//! Append-only, hash-chained log of ledger events.
//!
//! Each record commits to its predecessor:
//! ```text
//! digest[n] = SHA-256(domain_sep || digest[n-1] || n || height || event.canonical_bytes())
//! ```
//! with `digest[-1] = [0; 32]`. An indexer that holds the last digest can
//! detect any rewrite of history. The wall-clock `emitted_at` stamp is
//! informational and not part of the chain.

use chrono::{DateTime, Utc};
use custodian_types::{BlockHeight, LedgerEvent, constants};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// One committed notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Position in the log, starting at 0.
    pub sequence: u64,
    /// Substrate height of the call that emitted it.
    pub height: BlockHeight,
    /// Wall-clock time of emission.
    pub emitted_at: DateTime<Utc>,
    pub event: LedgerEvent,
    /// Chain digest over this record and its predecessor.
    pub digest: [u8; 32],
}

/// Ordered, append-only event log.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    records: Vec<EventRecord>,
}

impl EventLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `event` and return its sequence number.
    pub fn append(&mut self, height: BlockHeight, event: LedgerEvent) -> u64 {
        let sequence = self.records.len() as u64;
        let digest = Self::chain_digest(&self.head(), sequence, height, &event);

        tracing::debug!(
            sequence,
            height = %height,
            event = %event,
            digest = hex::encode(&digest[..8]),
            "Event appended"
        );

        self.records.push(EventRecord {
            sequence,
            height,
            emitted_at: Utc::now(),
            event,
            digest,
        });
        sequence
    }

    /// Digest of the last record, or zeroes for an empty log.
    #[must_use]
    pub fn head(&self) -> [u8; 32] {
        self.records.last().map_or([0u8; 32], |r| r.digest)
    }

    /// Records from `sequence` onwards (empty if past the end).
    #[must_use]
    pub fn since(&self, sequence: u64) -> &[EventRecord] {
        let start = usize::try_from(sequence)
            .unwrap_or(usize::MAX)
            .min(self.records.len());
        &self.records[start..]
    }

    #[must_use]
    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Recompute every digest from scratch and compare.
    #[must_use]
    pub fn verify_chain(&self) -> bool {
        Self::verify_records(&self.records)
    }

    /// Verify a detached slice of records that starts at sequence 0.
    #[must_use]
    pub fn verify_records(records: &[EventRecord]) -> bool {
        let mut prev = [0u8; 32];
        for (index, record) in records.iter().enumerate() {
            if record.sequence != index as u64 {
                return false;
            }
            let expected = Self::chain_digest(&prev, record.sequence, record.height, &record.event);
            if expected != record.digest {
                return false;
            }
            prev = record.digest;
        }
        true
    }

    fn chain_digest(
        prev: &[u8; 32],
        sequence: u64,
        height: BlockHeight,
        event: &LedgerEvent,
    ) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(constants::EVENT_CHAIN_DOMAIN);
        hasher.update(prev);
        hasher.update(sequence.to_le_bytes());
        hasher.update(height.0.to_le_bytes());
        hasher.update(event.canonical_bytes());
        hasher.finalize().into()
    }
}

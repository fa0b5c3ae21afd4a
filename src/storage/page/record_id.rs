use crate::storage::page::PageId;
use serde::{Deserialize, Serialize};

/// Identifies one tuple slot on one page.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordId {
    page_id: PageId,
    slot: u16,
}

impl RecordId {
    pub fn new(page_id: PageId, slot: u16) -> RecordId {
        RecordId { page_id, slot }
    }

    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    pub fn slot(&self) -> u16 {
        self.slot
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.page_id, self.slot)
    }
}

use serde::{Deserialize, Serialize};

/// Identifies one page of one table: the table id plus the page's ordinal
/// position in the heap file. Stable across restarts, since table ids are
/// derived from file paths and page numbers are file offsets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PageId {
    table_id: i32,
    page_no: u32,
}

impl PageId {
    pub fn new(table_id: i32, page_no: u32) -> PageId {
        PageId { table_id, page_no }
    }

    pub fn table_id(&self) -> i32 {
        self.table_id
    }

    pub fn page_no(&self) -> u32 {
        self.page_no
    }
}

impl std::fmt::Display for PageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.table_id, self.page_no)
    }
}

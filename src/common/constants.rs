// HeapPage
pub const CORRUPT_PAGE_MSG: &str = "Page image is not exactly one page in size.";
pub const PAGE_FULL_MSG: &str = "No unused slot available on the page.";
pub const SLOT_EMPTY_MSG: &str = "Slot is already unoccupied.";
pub const NOT_ON_PAGE_MSG: &str = "Tuple does not belong to this page.";
pub const SCHEMA_MISMATCH_MSG: &str = "Tuple fields do not match the page schema.";

// HeapFile
pub const SHORT_READ_MSG: &str = "Read past the end of the heap file.";
pub const WRONG_TABLE_MSG: &str = "Page id references a different table.";
pub const MISSING_RID_MSG: &str = "Tuple has no record id.";

// BufferPool
pub const NO_CLEAN_PAGE_MSG: &str = "No clean page available to evict.";

// Catalog
pub const NO_SUCH_TABLE_MSG: &str = "No table registered under the given id.";
pub const NO_SUCH_TABLE_NAME_MSG: &str = "No table registered under the given name.";

// Operators
pub const NOT_OPEN_MSG: &str = "Operator has not been opened.";
pub const ILLEGAL_AGGREGATE_MSG: &str = "Text columns only support COUNT.";

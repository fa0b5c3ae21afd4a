use crate::common::constants::{
    CORRUPT_PAGE_MSG, MISSING_RID_MSG, NOT_ON_PAGE_MSG, PAGE_FULL_MSG, SCHEMA_MISMATCH_MSG,
    SLOT_EMPTY_MSG,
};
use crate::common::{Error, Result};
use crate::concurrency::TransactionId;
use crate::config::config::MINNOW_DB_PAGE_SIZE_BYTES;
use crate::storage::page::{PageId, RecordId};
use crate::storage::tuple::Tuple;
use crate::types::Schema;
use std::sync::{Arc, RwLock};

pub type HeapPageHandle = Arc<RwLock<HeapPage>>;

/// A slotted heap page: a fixed-size byte image holding up to `capacity`
/// equal-width tuples behind an occupancy bitmap.
///
/// On disk the page is laid out as `| header | slot 0 | slot 1 | ... | pad |`
/// where the header holds one bit per slot, LSB-first within each byte
/// (bit 0 of byte 0 is slot 0). Unused slots and the trailing pad are
/// zero-filled.
///
/// The page also tracks two transient pieces of state that never reach
/// disk: the transaction that last dirtied it, and a snapshot of the byte
/// image from the last clean point, restored when that transaction aborts.
#[derive(Debug)]
pub struct HeapPage {
    pid: PageId,
    schema: Arc<Schema>,
    header: Vec<u8>,
    slots: Vec<Option<Tuple>>,
    dirty: Option<TransactionId>,
    before_image: Vec<u8>,
}

impl HeapPage {
    /// Number of tuple slots a page holds under the given schema. Each
    /// tuple costs its encoded width in bits plus one header bit.
    pub fn capacity(schema: &Schema) -> usize {
        (MINNOW_DB_PAGE_SIZE_BYTES * 8) / (schema.size() * 8 + 1)
    }

    /// Header size in bytes: one bit per slot, rounded up.
    pub fn header_size(schema: &Schema) -> usize {
        (Self::capacity(schema) + 7) / 8
    }

    /// Decodes a full page image. Fails if the buffer is not exactly one
    /// page, or if an occupied slot holds undecodable bytes.
    pub fn new_from_bytes(pid: PageId, schema: &Arc<Schema>, bytes: &[u8]) -> Result<HeapPage> {
        if bytes.len() != MINNOW_DB_PAGE_SIZE_BYTES {
            return Err(Error::InvalidData(CORRUPT_PAGE_MSG.to_string()));
        }

        let capacity = Self::capacity(schema);
        let header_size = Self::header_size(schema);
        let header = bytes[0..header_size].to_vec();
        let tuple_size = schema.size();

        let mut slots = Vec::with_capacity(capacity);
        for slot in 0..capacity {
            if header[slot / 8] >> (slot % 8) & 1 == 0 {
                slots.push(None);
                continue;
            }
            let start = header_size + slot * tuple_size;
            let mut tuple = Tuple::deserialize(&bytes[start..start + tuple_size], schema)?;
            tuple.set_rid(Some(RecordId::new(pid, slot as u16)));
            slots.push(Some(tuple));
        }

        Ok(HeapPage {
            pid,
            schema: Arc::clone(schema),
            header,
            slots,
            dirty: None,
            before_image: bytes.to_vec(),
        })
    }

    /// Creates a fresh page with a zeroed header and no tuples.
    pub fn empty(pid: PageId, schema: &Arc<Schema>) -> HeapPage {
        let capacity = Self::capacity(schema);
        HeapPage {
            pid,
            schema: Arc::clone(schema),
            header: vec![0; Self::header_size(schema)],
            slots: (0..capacity).map(|_| None).collect(),
            dirty: None,
            before_image: vec![0; MINNOW_DB_PAGE_SIZE_BYTES],
        }
    }

    pub fn get_id(&self) -> PageId {
        self.pid
    }

    pub fn get_schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    fn is_slot_used(&self, slot: usize) -> bool {
        self.header[slot / 8] >> (slot % 8) & 1 == 1
    }

    fn set_slot_used(&mut self, slot: usize, used: bool) {
        if used {
            self.header[slot / 8] |= 1 << (slot % 8);
        } else {
            self.header[slot / 8] &= !(1 << (slot % 8));
        }
    }

    /// Number of unoccupied tuple slots.
    pub fn num_unused_slots(&self) -> usize {
        (0..self.slots.len()).filter(|&i| !self.is_slot_used(i)).count()
    }

    pub fn num_tuples(&self) -> usize {
        self.slots.len() - self.num_unused_slots()
    }

    /// Places the tuple in the lowest-numbered unused slot, assigning its
    /// record id.
    pub fn insert_tuple(&mut self, mut tuple: Tuple) -> Result<()> {
        if !tuple.matches_schema(&self.schema) {
            return Err(Error::InvalidData(SCHEMA_MISMATCH_MSG.to_string()));
        }
        let slot = (0..self.slots.len())
            .find(|&i| !self.is_slot_used(i))
            .ok_or_else(|| Error::InvalidState(PAGE_FULL_MSG.to_string()))?;

        tuple.set_rid(Some(RecordId::new(self.pid, slot as u16)));
        self.slots[slot] = Some(tuple);
        self.set_slot_used(slot, true);
        Ok(())
    }

    /// Clears the slot the tuple's record id points at.
    pub fn delete_tuple(&mut self, tuple: &Tuple) -> Result<()> {
        let rid = tuple
            .rid()
            .ok_or_else(|| Error::InvalidInput(MISSING_RID_MSG.to_string()))?;
        if rid.page_id() != self.pid {
            return Err(Error::InvalidInput(NOT_ON_PAGE_MSG.to_string()));
        }
        let slot = rid.slot() as usize;
        if slot >= self.slots.len() {
            return Err(Error::InvalidInput(NOT_ON_PAGE_MSG.to_string()));
        }
        if !self.is_slot_used(slot) {
            return Err(Error::InvalidState(SLOT_EMPTY_MSG.to_string()));
        }
        self.slots[slot] = None;
        self.set_slot_used(slot, false);
        Ok(())
    }

    pub fn mark_dirty(&mut self, dirty: bool, tid: TransactionId) {
        self.dirty = if dirty { Some(tid) } else { None };
    }

    pub fn is_dirty(&self) -> Option<TransactionId> {
        self.dirty
    }

    /// Emits the full page image: header, slots in order (unused slots
    /// zero-filled), zero padding to the page size.
    pub fn page_data(&self) -> Vec<u8> {
        let tuple_size = self.schema.size();
        let mut data = Vec::with_capacity(MINNOW_DB_PAGE_SIZE_BYTES);
        data.extend(&self.header);
        for slot in &self.slots {
            match slot {
                Some(tuple) => {
                    for field in tuple.fields() {
                        data.extend(field.serialize());
                    }
                }
                None => data.extend(std::iter::repeat(0u8).take(tuple_size)),
            }
        }
        data.resize(MINNOW_DB_PAGE_SIZE_BYTES, 0);
        data
    }

    /// Re-snapshots the current image as the clean point, typically after a
    /// successful flush.
    pub fn set_before_image(&mut self) {
        self.before_image = self.page_data();
    }

    pub fn before_image(&self) -> &[u8] {
        &self.before_image
    }

    /// Rolls the page content back to the last clean snapshot and clears
    /// the dirty marker.
    pub fn restore_before_image(&mut self) -> Result<()> {
        let restored = HeapPage::new_from_bytes(self.pid, &self.schema, &self.before_image.clone())?;
        self.header = restored.header;
        self.slots = restored.slots;
        self.dirty = None;
        Ok(())
    }

    /// Iterates occupied tuples in ascending slot order.
    pub fn iter(&self) -> impl Iterator<Item = &Tuple> {
        self.slots.iter().flatten()
    }

    /// Clones out the occupied tuples in ascending slot order.
    pub fn tuples(&self) -> Vec<Tuple> {
        self.iter().cloned().collect()
    }
}

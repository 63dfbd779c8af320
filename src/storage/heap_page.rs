use anyhow::Result;

use crate::catalog::schema::Schema;
use crate::common::{PageId, SlotId, PAGE_SIZE};
use crate::concurrency::TransactionId;
use crate::error::DbError;
use crate::tuple::value::Value;
use crate::tuple::Tuple;

/// The number of tuple slots on a page holding tuples of `tuple_size` bytes:
/// the largest n with `ceil(n / 8) + n * tuple_size <= PAGE_SIZE`, since each
/// slot costs one header bit on top of its payload.
pub fn slots_per_page(tuple_size: usize) -> usize {
    (PAGE_SIZE * 8) / (tuple_size * 8 + 1)
}

fn header_size(slot_count: usize) -> usize {
    slot_count.div_ceil(8)
}

/// A fixed-size page of schema-homogeneous tuples. The on-disk layout is a
/// slot occupancy bitmap (bit i of byte b covers slot 8*b + i, LSB first)
/// followed by the fixed-width tuple slots.
#[derive(Debug)]
pub struct HeapPage {
    pid: PageId,
    schema: Schema,
    header: Vec<u8>,
    tuples: Vec<Option<Tuple>>,
    dirtying_tid: Option<TransactionId>,
}

impl HeapPage {
    /// Parses a page from its serialized image. Occupied slots are decoded
    /// with the schema's per-type decoders and get their record id assigned.
    pub fn parse(pid: PageId, schema: Schema, bytes: &[u8]) -> Self {
        let tuple_size = schema.size();
        let slot_count = slots_per_page(tuple_size);
        let header_size = header_size(slot_count);
        let header = bytes[..header_size].to_vec();

        let mut tuples = Vec::with_capacity(slot_count);
        for slot in 0..slot_count {
            if header[slot / 8] & (1 << (slot % 8)) != 0 {
                let offset = header_size + slot * tuple_size;
                let mut tuple = decode_tuple(&bytes[offset..offset + tuple_size], &schema);
                tuple.set_record_id(Some((pid, slot as SlotId)));
                tuples.push(Some(tuple));
            } else {
                tuples.push(None);
            }
        }

        Self {
            pid,
            schema,
            header,
            tuples,
            dirtying_tid: None,
        }
    }

    /// Creates a page with every slot empty.
    pub fn new_empty(pid: PageId, schema: Schema) -> Self {
        let slot_count = slots_per_page(schema.size());
        Self {
            pid,
            schema,
            header: vec![0u8; header_size(slot_count)],
            tuples: vec![None; slot_count],
            dirtying_tid: None,
        }
    }

    pub fn pid(&self) -> PageId {
        self.pid
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn slot_count(&self) -> usize {
        self.tuples.len()
    }

    pub fn empty_slot_count(&self) -> usize {
        self.tuples.iter().filter(|slot| slot.is_none()).count()
    }

    fn slot_used(&self, slot: usize) -> bool {
        self.header[slot / 8] & (1 << (slot % 8)) != 0
    }

    fn set_slot(&mut self, slot: usize, used: bool) {
        if used {
            self.header[slot / 8] |= 1 << (slot % 8);
        } else {
            self.header[slot / 8] &= !(1 << (slot % 8));
        }
    }

    /// Places the tuple in the lowest-numbered empty slot and assigns its
    /// record id.
    pub fn insert(&mut self, tuple: &mut Tuple) -> Result<()> {
        if !tuple.matches_schema(&self.schema) {
            return Err(DbError::SchemaMismatch(self.pid.0).into());
        }
        let slot = self
            .tuples
            .iter()
            .position(|slot| slot.is_none())
            .ok_or(DbError::PageFull(self.pid))?;

        tuple.set_record_id(Some((self.pid, slot as SlotId)));
        self.tuples[slot] = Some(tuple.clone());
        self.set_slot(slot, true);
        Ok(())
    }

    /// Removes the tuple at the record id carried by `tuple` and clears the
    /// occupancy bit.
    pub fn delete(&mut self, tuple: &Tuple) -> Result<()> {
        let record_id = tuple.record_id().ok_or_else(|| {
            DbError::IllegalArgument("cannot delete a tuple that has no record id".to_owned())
        })?;
        let (pid, slot) = record_id;
        let slot = slot as usize;
        if pid != self.pid || slot >= self.tuples.len() || !self.slot_used(slot) {
            return Err(DbError::TupleNotFound(record_id).into());
        }

        self.tuples[slot] = None;
        self.set_slot(slot, false);
        Ok(())
    }

    /// Live tuples in slot order.
    pub fn iter_tuples(&self) -> impl Iterator<Item = &Tuple> {
        self.tuples.iter().flatten()
    }

    /// Produces the on-disk image of this page. `parse` of the result yields
    /// an equivalent page.
    pub fn serialize(&self) -> Vec<u8> {
        let tuple_size = self.schema.size();
        let header_size = self.header.len();
        let mut bytes = vec![0u8; PAGE_SIZE];
        bytes[..header_size].copy_from_slice(&self.header);

        for (slot, tuple) in self.tuples.iter().enumerate() {
            if let Some(tuple) = tuple {
                let mut offset = header_size + slot * tuple_size;
                for value in tuple.values() {
                    value.serialize_value(&mut bytes[offset..]);
                    offset += value.size();
                }
            }
        }
        bytes
    }

    /// The transaction that last dirtied this page, if it is dirty at all.
    pub fn is_dirty(&self) -> Option<TransactionId> {
        self.dirtying_tid
    }

    pub fn mark_dirty(&mut self, dirtying_tid: Option<TransactionId>) {
        self.dirtying_tid = dirtying_tid;
    }
}

fn decode_tuple(bytes: &[u8], schema: &Schema) -> Tuple {
    let mut values = Vec::with_capacity(schema.column_count());
    let mut offset = 0;
    for column in schema.columns() {
        let type_id = column.type_id();
        values.push(Value::parse_value(&bytes[offset..], type_id));
        offset += type_id.size();
    }
    Tuple::new(values)
}

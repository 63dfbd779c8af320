use self::value::Value;
use crate::catalog::schema::Schema;
use crate::common::RecordId;

pub mod value;

/// A fixed-schema record. The record id is assigned once the tuple lives in
/// a slot on some page and cleared again when it is deleted.
#[derive(Clone, Debug, PartialEq)]
pub struct Tuple {
    pub values: Vec<Value>,
    record_id: Option<RecordId>,
}

impl Tuple {
    pub fn new(values: Vec<Value>) -> Self {
        Self {
            values,
            record_id: None,
        }
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn value(&self, col_idx: usize) -> &Value {
        &self.values[col_idx]
    }

    pub fn record_id(&self) -> Option<RecordId> {
        self.record_id
    }

    pub fn set_record_id(&mut self, record_id: Option<RecordId>) {
        self.record_id = record_id;
    }

    /// True if the value types line up positionally with `schema`.
    pub fn matches_schema(&self, schema: &Schema) -> bool {
        self.values.len() == schema.column_count()
            && self
                .values
                .iter()
                .zip(schema.columns().iter())
                .all(|(value, col)| value.type_id() == col.type_id())
    }

    pub fn as_i32(&self, col_idx: usize) -> i32 {
        self.values[col_idx].as_i32()
    }

    pub fn as_str(&self, col_idx: usize) -> &str {
        self.values[col_idx].as_str()
    }
}

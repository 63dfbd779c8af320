use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use anyhow::{Error, Result};

use crate::catalog::schema::Schema;
use crate::common::TableId;
use crate::storage::heap_file::HeapFile;

pub mod schema;

struct TableInfo {
    name: String,
    file: Arc<HeapFile>,
    primary_key: String,
}

/// Maps table ids and names to their heap files and schemas. The catalog is
/// populated explicitly by the embedding application at startup; it is not
/// persisted here.
pub struct Catalog {
    tables: RwLock<HashMap<TableId, TableInfo>>,
    name_to_id: RwLock<HashMap<String, TableId>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            name_to_id: RwLock::new(HashMap::new()),
        }
    }

    /// Registers a table under `name`. Re-registering a name replaces the
    /// previous binding.
    pub fn add_table(&self, name: &str, file: Arc<HeapFile>, primary_key: &str) -> TableId {
        let table_id = file.id();
        let mut tables = self.tables.write().unwrap();
        let mut name_to_id = self.name_to_id.write().unwrap();

        if let Some(old_id) = name_to_id.insert(name.to_owned(), table_id) {
            if old_id != table_id {
                tables.remove(&old_id);
            }
        }
        tables.insert(
            table_id,
            TableInfo {
                name: name.to_owned(),
                file,
                primary_key: primary_key.to_owned(),
            },
        );
        table_id
    }

    pub fn file(&self, table_id: TableId) -> Result<Arc<HeapFile>> {
        self.tables
            .read()
            .unwrap()
            .get(&table_id)
            .map(|info| Arc::clone(&info.file))
            .ok_or_else(|| Error::msg(format!("No table with id {}", table_id)))
    }

    pub fn schema(&self, table_id: TableId) -> Result<Schema> {
        Ok(self.file(table_id)?.schema().clone())
    }

    pub fn table_name(&self, table_id: TableId) -> Option<String> {
        self.tables
            .read()
            .unwrap()
            .get(&table_id)
            .map(|info| info.name.clone())
    }

    pub fn table_id(&self, name: &str) -> Option<TableId> {
        self.name_to_id.read().unwrap().get(name).copied()
    }

    pub fn primary_key(&self, table_id: TableId) -> Option<String> {
        self.tables
            .read()
            .unwrap()
            .get(&table_id)
            .map(|info| info.primary_key.clone())
    }

    pub fn table_ids(&self) -> Vec<TableId> {
        self.tables.read().unwrap().keys().copied().collect()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use anyhow::Result;
use lazy_static::lazy_static;

use self::int_histogram::IntHistogram;
use self::string_histogram::StringHistogram;
use crate::buffer::buffer_pool::BufferPool;
use crate::catalog::schema::{Schema, TypeId};
use crate::catalog::Catalog;
use crate::common::{TableId, NUM_HIST_BINS};
use crate::concurrency::Transaction;
use crate::error::DbError;
use crate::executors::seq_scan_executor::SeqScanExecutor;
use crate::executors::Executor;
use crate::tuple::value::{CompareOp, Value};

pub mod int_histogram;
pub mod string_histogram;

/// Default page I/O cost used when computing statistics for a whole catalog.
pub const IO_COST_PER_PAGE: usize = 1000;

enum ColumnHistogram {
    Int(IntHistogram),
    Text(StringHistogram),
}

/// Per-table statistics: one histogram per column plus tuple counts, built
/// by scanning the table twice (ranges first, then population) inside its
/// own transaction. The planner reads these through the process-wide
/// registry below.
pub struct TableStats {
    io_cost_per_page: usize,
    total_tuples: usize,
    schema: Schema,
    histograms: Vec<ColumnHistogram>,
}

impl TableStats {
    pub fn new(
        table_id: TableId,
        io_cost_per_page: usize,
        catalog: &Catalog,
        pool: &BufferPool,
    ) -> Result<Self> {
        let file = catalog.file(table_id)?;
        let schema = file.schema().clone();
        let transaction = Transaction::start(pool);

        let mut total_tuples = 0;
        let mut ranges: Vec<Option<(i32, i32)>> = vec![None; schema.column_count()];
        let mut scan = SeqScanExecutor::new(&file, transaction.tid(), pool);
        while let Some(tuple) = Executor::next(&mut scan).transpose()? {
            total_tuples += 1;
            for (idx, value) in tuple.values().iter().enumerate() {
                if let Value::Integer(v) = value {
                    ranges[idx] = Some(match ranges[idx] {
                        None => (*v, *v),
                        Some((min, max)) => (min.min(*v), max.max(*v)),
                    });
                }
            }
        }

        let mut histograms = Vec::with_capacity(schema.column_count());
        for (idx, column) in schema.columns().iter().enumerate() {
            let histogram = match column.type_id() {
                TypeId::Integer => {
                    let (min, max) = ranges[idx].unwrap_or((0, 0));
                    ColumnHistogram::Int(IntHistogram::new(NUM_HIST_BINS, min, max)?)
                }
                TypeId::Text => ColumnHistogram::Text(StringHistogram::new(NUM_HIST_BINS)?),
            };
            histograms.push(histogram);
        }

        scan.rewind()?;
        while let Some(tuple) = Executor::next(&mut scan).transpose()? {
            for (idx, value) in tuple.values().iter().enumerate() {
                match (&mut histograms[idx], value) {
                    (ColumnHistogram::Int(histogram), Value::Integer(v)) => {
                        histogram.add_value(*v)?
                    }
                    (ColumnHistogram::Text(histogram), Value::Text(s)) => histogram.add_value(s)?,
                    _ => unreachable!("histogram type diverged from column type"),
                }
            }
        }

        transaction.commit()?;

        Ok(Self {
            io_cost_per_page,
            total_tuples,
            schema,
            histograms,
        })
    }

    /// The cost of scanning the whole table once, with nothing cached.
    pub fn estimate_scan_cost(&self) -> f64 {
        self.total_tuples as f64 * self.io_cost_per_page as f64
    }

    /// How many tuples a scan with the given predicate selectivity returns.
    pub fn estimate_table_cardinality(&self, selectivity: f64) -> usize {
        (self.total_tuples as f64 * selectivity) as usize
    }

    /// The estimated selectivity of `column(field) op constant`.
    pub fn estimate_selectivity(
        &self,
        field: usize,
        op: CompareOp,
        constant: &Value,
    ) -> Result<f64> {
        let histogram = self.histograms.get(field).ok_or_else(|| {
            DbError::IllegalArgument(format!("column index {} is out of range", field))
        })?;
        match (histogram, constant) {
            (ColumnHistogram::Int(histogram), Value::Integer(v)) => {
                Ok(histogram.estimate_selectivity(op, *v))
            }
            (ColumnHistogram::Text(histogram), Value::Text(s)) => {
                Ok(histogram.estimate_selectivity(op, s))
            }
            _ => Err(DbError::IllegalArgument(format!(
                "predicate constant does not match the type of column {}",
                field
            ))
            .into()),
        }
    }

    pub fn total_tuples(&self) -> usize {
        self.total_tuples
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }
}

lazy_static! {
    static ref STATS_REGISTRY: RwLock<HashMap<String, Arc<TableStats>>> =
        RwLock::new(HashMap::new());
}

pub fn get_table_stats(table_name: &str) -> Option<Arc<TableStats>> {
    STATS_REGISTRY.read().unwrap().get(table_name).cloned()
}

pub fn set_table_stats(table_name: &str, stats: Arc<TableStats>) {
    STATS_REGISTRY
        .write()
        .unwrap()
        .insert(table_name.to_owned(), stats);
}

/// Builds and registers statistics for every table in the catalog. Called by
/// the embedding application once the catalog is loaded.
pub fn compute_statistics(catalog: &Catalog, pool: &BufferPool) -> Result<()> {
    for table_id in catalog.table_ids() {
        let stats = TableStats::new(table_id, IO_COST_PER_PAGE, catalog, pool)?;
        if let Some(name) = catalog.table_name(table_id) {
            set_table_stats(&name, Arc::new(stats));
        }
    }
    Ok(())
}

//! Warehouse table store capability.
//!
//! The load orchestrator never talks to a warehouse directly; it drives a
//! [`TableStore`], which owns dataset/table lifecycle and row insertion.
//! Two implementations ship here: [`MemoryTableStore`], an in-memory fake
//! for tests and embedders, and [`LocalTableStore`], which materializes
//! datasets as directories and tables as a schema JSON plus a JSONL data
//! file so the CLI works end to end without warehouse credentials.

use std::{
    collections::BTreeMap,
    fmt,
    fs::{self, File, OpenOptions},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use log::debug;
use serde::Serialize;

use crate::{data::Row, error::StoreError, schema::Schema};

/// Identity of a table inside the warehouse. The warehouse owns the table's
/// lifecycle; this pipeline only issues create/purge/insert requests at it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableRef {
    pub dataset_id: String,
    pub table_id: String,
}

impl TableRef {
    pub fn new(dataset_id: impl Into<String>, table_id: impl Into<String>) -> Self {
        Self {
            dataset_id: dataset_id.into(),
            table_id: table_id.into(),
        }
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.dataset_id, self.table_id)
    }
}

pub trait TableStore {
    fn dataset_exists(&self, dataset_id: &str) -> Result<bool, StoreError>;

    fn create_dataset(&mut self, dataset_id: &str) -> Result<(), StoreError>;

    fn table_exists(&self, table: &TableRef) -> Result<bool, StoreError>;

    fn create_table(&mut self, table: &TableRef, schema: &Schema) -> Result<(), StoreError>;

    /// Deletes all rows while leaving the table itself in place.
    fn purge_table(&mut self, table: &TableRef) -> Result<(), StoreError>;

    fn insert_batch(&mut self, table: &TableRef, rows: &[Row]) -> Result<(), StoreError>;
}

#[derive(Debug)]
struct MemoryTable {
    schema: Schema,
    rows: Vec<Row>,
}

/// In-memory store: the testing fake for the orchestrator.
#[derive(Debug, Default)]
pub struct MemoryTableStore {
    datasets: BTreeMap<String, BTreeMap<String, MemoryTable>>,
}

impl MemoryTableStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table_rows(&self, table: &TableRef) -> Option<&[Row]> {
        self.datasets
            .get(&table.dataset_id)
            .and_then(|tables| tables.get(&table.table_id))
            .map(|entry| entry.rows.as_slice())
    }

    pub fn table_schema(&self, table: &TableRef) -> Option<&Schema> {
        self.datasets
            .get(&table.dataset_id)
            .and_then(|tables| tables.get(&table.table_id))
            .map(|entry| &entry.schema)
    }

    fn table_mut(&mut self, table: &TableRef) -> Result<&mut MemoryTable, StoreError> {
        self.datasets
            .get_mut(&table.dataset_id)
            .and_then(|tables| tables.get_mut(&table.table_id))
            .ok_or_else(|| StoreError::rejected(format!("Table '{table}' does not exist")))
    }
}

impl TableStore for MemoryTableStore {
    fn dataset_exists(&self, dataset_id: &str) -> Result<bool, StoreError> {
        Ok(self.datasets.contains_key(dataset_id))
    }

    fn create_dataset(&mut self, dataset_id: &str) -> Result<(), StoreError> {
        self.datasets.entry(dataset_id.to_string()).or_default();
        Ok(())
    }

    fn table_exists(&self, table: &TableRef) -> Result<bool, StoreError> {
        Ok(self
            .datasets
            .get(&table.dataset_id)
            .is_some_and(|tables| tables.contains_key(&table.table_id)))
    }

    fn create_table(&mut self, table: &TableRef, schema: &Schema) -> Result<(), StoreError> {
        let dataset = self.datasets.get_mut(&table.dataset_id).ok_or_else(|| {
            StoreError::rejected(format!("Dataset '{}' does not exist", table.dataset_id))
        })?;
        dataset.insert(
            table.table_id.clone(),
            MemoryTable {
                schema: schema.clone(),
                rows: Vec::new(),
            },
        );
        Ok(())
    }

    fn purge_table(&mut self, table: &TableRef) -> Result<(), StoreError> {
        self.table_mut(table)?.rows.clear();
        Ok(())
    }

    fn insert_batch(&mut self, table: &TableRef, rows: &[Row]) -> Result<(), StoreError> {
        self.table_mut(table)?.rows.extend(rows.iter().cloned());
        Ok(())
    }
}

/// Directory-backed store: a dataset is a subdirectory of the warehouse
/// root, a table is `<table>.schema.json` plus `<table>.jsonl`.
pub struct LocalTableStore {
    root: PathBuf,
}

impl LocalTableStore {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root)
            .map_err(|err| StoreError::io(format!("Creating warehouse root {root:?}"), err))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn dataset_dir(&self, dataset_id: &str) -> PathBuf {
        self.root.join(dataset_id)
    }

    fn schema_path(&self, table: &TableRef) -> PathBuf {
        self.dataset_dir(&table.dataset_id)
            .join(format!("{}.schema.json", table.table_id))
    }

    fn data_path(&self, table: &TableRef) -> PathBuf {
        self.dataset_dir(&table.dataset_id)
            .join(format!("{}.jsonl", table.table_id))
    }
}

impl TableStore for LocalTableStore {
    fn dataset_exists(&self, dataset_id: &str) -> Result<bool, StoreError> {
        Ok(self.dataset_dir(dataset_id).is_dir())
    }

    fn create_dataset(&mut self, dataset_id: &str) -> Result<(), StoreError> {
        let dir = self.dataset_dir(dataset_id);
        fs::create_dir_all(&dir)
            .map_err(|err| StoreError::io(format!("Creating dataset directory {dir:?}"), err))
    }

    fn table_exists(&self, table: &TableRef) -> Result<bool, StoreError> {
        Ok(self.schema_path(table).is_file())
    }

    fn create_table(&mut self, table: &TableRef, schema: &Schema) -> Result<(), StoreError> {
        let schema_path = self.schema_path(table);
        let file = File::create(&schema_path)
            .map_err(|err| StoreError::io(format!("Creating schema file {schema_path:?}"), err))?;
        serde_json::to_writer_pretty(BufWriter::new(file), schema)
            .map_err(|err| StoreError::rejected(format!("Writing schema for '{table}': {err}")))?;

        let data_path = self.data_path(table);
        File::create(&data_path)
            .map_err(|err| StoreError::io(format!("Creating table file {data_path:?}"), err))?;
        debug!("Created table '{table}' at {data_path:?}");
        Ok(())
    }

    fn purge_table(&mut self, table: &TableRef) -> Result<(), StoreError> {
        let data_path = self.data_path(table);
        File::create(&data_path)
            .map_err(|err| StoreError::io(format!("Truncating table file {data_path:?}"), err))?;
        Ok(())
    }

    fn insert_batch(&mut self, table: &TableRef, rows: &[Row]) -> Result<(), StoreError> {
        let data_path = self.data_path(table);
        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&data_path)
            .map_err(|err| StoreError::io(format!("Opening table file {data_path:?}"), err))?;
        let mut writer = BufWriter::new(file);
        for row in rows {
            let line = serde_json::to_string(row)
                .map_err(|err| StoreError::rejected(format!("Serializing row: {err}")))?;
            writeln!(writer, "{line}")
                .map_err(|err| StoreError::io(format!("Appending to {data_path:?}"), err))?;
        }
        writer
            .flush()
            .map_err(|err| StoreError::io(format!("Flushing {data_path:?}"), err))
    }
}

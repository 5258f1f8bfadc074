//! Flattens nested entity results into single-level rows.
//!
//! Column naming is `<section>_<field>`: vendor, customer and invoice details
//! keep their provider key order, and only the first line item is carried
//! (as `line_item_<field>`). Downstream consumers expect one summary row per
//! document.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::classify::Category;
use crate::extract::EntityResult;

pub const CATEGORY_COLUMN: &str = "category";
pub const FILE_NAME_COLUMN: &str = "file_name";

/// One processed file, tagged with its category.
#[derive(Debug, Clone)]
pub struct CategorizedRecord {
    pub category: Category,
    pub file_name: String,
    pub entities: EntityResult,
}

/// Ordered column → scalar mapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatRow {
    cells: Vec<(String, Value)>,
}

impl FlatRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a column, keeping its original position if it already exists.
    pub fn insert(&mut self, column: impl Into<String>, value: Value) {
        let column = column.into();
        match self.cells.iter_mut().find(|(name, _)| *name == column) {
            Some(cell) => cell.1 = value,
            None => self.cells.push((column, value)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.cells
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.cells.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    fn extend_prefixed(&mut self, prefix: &str, section: &Map<String, Value>) {
        for (key, value) in section {
            self.insert(format!("{}_{}", prefix, key), value.clone());
        }
    }
}

pub fn flatten(record: &CategorizedRecord) -> FlatRow {
    let mut row = FlatRow::new();
    row.insert(
        CATEGORY_COLUMN,
        Value::String(record.category.as_str().to_string()),
    );
    row.insert(FILE_NAME_COLUMN, Value::String(record.file_name.clone()));

    let entities = &record.entities;
    row.extend_prefixed("vendor", &entities.vendor_details);
    row.extend_prefixed("customer", &entities.customer_details);
    row.extend_prefixed("invoice", &entities.invoice_details);

    if let Some(first_item) = entities.line_items.first() {
        row.extend_prefixed("line_item", first_item);
    }

    row
}

/// Flattened rows partitioned by category, ready for the output store.
#[derive(Debug, Clone, Default)]
pub struct CategorizedBatch {
    rows: BTreeMap<Category, Vec<FlatRow>>,
}

impl CategorizedBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a CategorizedRecord>) -> Self {
        let mut batch = Self::new();
        for record in records {
            batch.push(record);
        }
        batch
    }

    pub fn push(&mut self, record: &CategorizedRecord) {
        self.rows
            .entry(record.category)
            .or_default()
            .push(flatten(record));
    }

    pub fn rows(&self, category: Category) -> &[FlatRow] {
        self.rows.get(&category).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Categories with at least one row, in a stable order.
    pub fn iter(&self) -> impl Iterator<Item = (Category, &[FlatRow])> {
        self.rows
            .iter()
            .filter(|(_, rows)| !rows.is_empty())
            .map(|(category, rows)| (*category, rows.as_slice()))
    }

    pub fn total_rows(&self) -> usize {
        self.rows.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total_rows() == 0
    }
}

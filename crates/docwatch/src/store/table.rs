//! In-memory form of one tabular output file.

use std::io::Write;
use std::path::Path;

use serde_json::Value;

use crate::aggregate::FlatRow;

/// Header plus rows of strings. Every row has exactly `headers.len()` cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads an existing CSV file. Short records are padded; surplus cells get
    /// placeholder column names so nothing already on disk is dropped.
    pub fn read(path: &Path) -> Result<Self, csv::Error> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(path)?;

        let mut table = Table {
            headers: reader.headers()?.iter().map(str::to_string).collect(),
            rows: Vec::new(),
        };

        for record in reader.records() {
            let record = record?;
            while table.headers.len() < record.len() {
                let placeholder = format!("column_{}", table.headers.len() + 1);
                table.add_column(placeholder);
            }
            let mut row: Vec<String> = record.iter().map(str::to_string).collect();
            row.resize(table.headers.len(), String::new());
            table.rows.push(row);
        }

        Ok(table)
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Appends rows after the existing ones. Columns first seen here are
    /// added to the right, and earlier rows get empty cells for them.
    pub fn append_rows(&mut self, rows: &[FlatRow]) {
        for row in rows {
            for column in row.columns() {
                if !self.headers.iter().any(|h| h == column) {
                    self.add_column(column.to_string());
                }
            }
        }

        for row in rows {
            let mut cells = vec![String::new(); self.headers.len()];
            for (column, value) in row.iter() {
                if let Some(index) = self.headers.iter().position(|h| h == column) {
                    cells[index] = cell_text(value);
                }
            }
            self.rows.push(cells);
        }
    }

    pub fn append_blank_rows(&mut self, count: usize) {
        for _ in 0..count {
            self.rows.push(vec![String::new(); self.headers.len()]);
        }
    }

    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut writer = csv::WriterBuilder::new().flexible(false).from_writer(writer);
        if self.headers.is_empty() {
            return Ok(());
        }
        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
        Ok(())
    }

    fn add_column(&mut self, name: String) {
        self.headers.push(name);
        for row in &mut self.rows {
            row.push(String::new());
        }
    }
}

/// Renders a JSON scalar as cell text. Nested values are kept as compact JSON.
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

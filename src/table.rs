use std::error::Error;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use csv::ReaderBuilder;
use hashbrown::{HashMap, HashSet};
use tracing::{debug, warn};

pub const EXPERIMENT_COLUMN: &str = "experiment";

/// One result row. Only non-empty cells are kept, so a missing value and an
/// absent column look the same to callers.
#[derive(Debug, Clone)]
pub struct Row {
    cells: HashMap<String, String>,
}

impl Row {
    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells.get(column).map(String::as_str)
    }

    pub fn numeric(&self, column: &str) -> Option<f64> {
        self.get(column)?.trim().parse().ok()
    }
}

/// The full sweep-results table, columns in file order.
#[derive(Debug, Clone)]
pub struct ResultTable {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl ResultTable {
    pub fn load(path: &Path) -> Result<Self, Box<dyn Error>> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, Box<dyn Error>> {
        let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(reader);

        let columns: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
        let mut rows = Vec::new();
        for result in rdr.records() {
            let record = result?;
            let mut cells = HashMap::new();
            for (column, value) in columns.iter().zip(record.iter()) {
                if !value.trim().is_empty() {
                    cells.insert(column.clone(), value.trim().to_string());
                }
            }
            rows.push(Row { cells });
        }
        debug!("Loaded {} rows, {} columns", rows.len(), columns.len());
        Ok(ResultTable { columns, rows })
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Groups rows by experiment tag, in first-seen order. Rows without a
    /// tag cannot belong to any sweep and are dropped.
    pub fn groups(&self) -> Vec<ExperimentGroup> {
        let mut order: Vec<String> = Vec::new();
        let mut by_tag: HashMap<String, Vec<Row>> = HashMap::new();
        for row in &self.rows {
            let Some(tag) = row.get(EXPERIMENT_COLUMN) else {
                warn!("Dropping row without an experiment tag");
                continue;
            };
            if !by_tag.contains_key(tag) {
                order.push(tag.to_string());
            }
            by_tag
                .entry(tag.to_string())
                .or_default()
                .push(row.clone());
        }
        order
            .into_iter()
            .map(|experiment| {
                let rows = by_tag.remove(&experiment).unwrap_or_default();
                ExperimentGroup { experiment, rows }
            })
            .collect()
    }
}

/// All rows sharing one experiment tag.
#[derive(Debug, Clone)]
pub struct ExperimentGroup {
    pub experiment: String,
    pub rows: Vec<Row>,
}

impl ExperimentGroup {
    /// Distinct values of `column` across the group, counting a missing
    /// value as one extra distinct value.
    pub fn distinct(&self, column: &str) -> usize {
        let values: HashSet<Option<&str>> =
            self.rows.iter().map(|row| row.get(column)).collect();
        values.len()
    }

    /// The column's value when it is present and the same in every row.
    pub fn constant(&self, column: &str) -> Option<&str> {
        if self.distinct(column) != 1 {
            return None;
        }
        self.rows.first()?.get(column)
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.rows.iter().any(|row| row.get(column).is_some())
    }
}

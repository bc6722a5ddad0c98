//! Tabular views of links and devices

use crate::device::Device;
use crate::error::LinkResult;
use crate::link::Link;
use crate::network::Network;
use hm_core::Paramset;
use indexmap::{IndexMap, IndexSet};
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// Columns every link table starts with
pub const FIXED_COLUMNS: [&str; 4] = ["sender", "receiver", "SHORT_ACTION_TYPE", "LONG_ACTION_TYPE"];

/// One row per link, one column per paramset key
///
/// Keys beyond the fixed columns appear in the order they were first seen.
#[derive(Debug, Clone)]
pub struct LinkTable {
    columns: IndexSet<String>,
    rows: Vec<(String, IndexMap<String, String>)>,
}

impl Default for LinkTable {
    fn default() -> Self {
        Self {
            columns: FIXED_COLUMNS.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
        }
    }
}

impl LinkTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, link: &Link, paramset: &Paramset) {
        let mut cells = IndexMap::new();
        cells.insert("sender".to_string(), link.sender().address().to_string());
        cells.insert("receiver".to_string(), link.receiver().address().to_string());
        for (key, value) in paramset {
            self.columns.insert(key.clone());
            cells.insert(key.clone(), value.to_string());
        }
        let label = format!(
            "{} -> {}",
            link.sender().display_name(),
            link.receiver().display_name()
        );
        self.rows.push((label, cells));
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cell of `column` in row `row`; `None` when the link lacks the key
    pub fn cell(&self, row: usize, column: &str) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|(_, cells)| cells.get(column))
            .map(String::as_str)
    }

    pub fn label(&self, row: usize) -> Option<&str> {
        self.rows.get(row).map(|(label, _)| label.as_str())
    }
}

impl fmt::Display for LinkTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label_width = self
            .rows
            .iter()
            .map(|(label, _)| label.chars().count())
            .max()
            .unwrap_or(0);
        let widths: Vec<usize> = self
            .columns
            .iter()
            .map(|column| {
                self.rows
                    .iter()
                    .filter_map(|(_, cells)| cells.get(column))
                    .map(|cell| cell.chars().count())
                    .chain(std::iter::once(column.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        write!(f, "{:<label_width$}", "")?;
        for (column, width) in self.columns.iter().zip(&widths) {
            write!(f, "  {:>width$}", column, width = *width)?;
        }
        writeln!(f)?;

        for (label, cells) in &self.rows {
            write!(f, "{:<label_width$}", label)?;
            for (column, width) in self.columns.iter().zip(&widths) {
                let cell = cells.get(column).map(String::as_str).unwrap_or("");
                write!(f, "  {:>width$}", cell, width = *width)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Aligned text listing of devices: address, type and name per row
pub fn device_list_text(devices: &[Arc<Device>]) -> String {
    let rows: Vec<[&str; 3]> = devices
        .iter()
        .map(|d| [d.address().as_str(), d.device_type(), d.name().unwrap_or("")])
        .collect();
    let header = ["address", "type", "name"];
    let mut widths = header.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    for row in std::iter::once(&header).chain(&rows) {
        let line = format!(
            "{:<w0$}  {:<w1$}  {}",
            row[0],
            row[1],
            row[2],
            w0 = widths[0],
            w1 = widths[1]
        );
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

impl Network {
    /// Table of all links and their receiver paramsets
    pub async fn link_table(&self) -> LinkResult<LinkTable> {
        let mut table = LinkTable::new();
        for mut link in self.links().await? {
            match link.paramset(self.rpc(), false).await {
                Ok(paramset) => {
                    let paramset = paramset.clone();
                    table.push(&link, &paramset);
                }
                Err(e) => warn!(link = %link, error = %e, "Cannot read link paramset"),
            }
        }
        Ok(table)
    }
}

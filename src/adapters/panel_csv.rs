//! Delimited-text reader for the person-wave panel.

use std::io::Read;

use crate::config::ColumnMapping;
use crate::domain::model::{parse_integral, PanelRecord, PanelTable, PersonId};
use crate::utils::error::{DidError, Result};

#[derive(Debug, Clone, Copy)]
struct ColumnIndex {
    person_id: usize,
    wave: usize,
    union: usize,
    sex: usize,
    wage: usize,
}

impl ColumnIndex {
    fn resolve(headers: &csv::StringRecord, columns: &ColumnMapping) -> Result<Self> {
        let available: Vec<String> = headers.iter().map(|h| h.trim().to_string()).collect();
        let find = |name: &str| {
            available
                .iter()
                .position(|h| h == name.trim())
                .ok_or_else(|| DidError::MissingColumnError {
                    column: name.to_string(),
                    available: available.clone(),
                })
        };

        Ok(Self {
            person_id: find(&columns.person_id)?,
            wave: find(&columns.wave)?,
            union: find(&columns.union)?,
            sex: find(&columns.sex)?,
            wage: find(&columns.wage)?,
        })
    }
}

/// 0/1 (also `0.0`/`1.0`) or true/false; anything else is missing.
pub fn parse_union_status(raw: &str) -> Option<bool> {
    let raw = raw.trim();
    match raw.to_ascii_lowercase().as_str() {
        "true" => return Some(true),
        "false" => return Some(false),
        _ => {}
    }
    match raw.parse::<f64>() {
        Ok(v) if v == 1.0 => Some(true),
        Ok(v) if v == 0.0 => Some(false),
        _ => None,
    }
}

/// Empty, NA/NaN and non-numeric text are missing.
pub fn parse_wage(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn non_empty(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}

pub struct PanelLoader<'a> {
    columns: &'a ColumnMapping,
    delimiter: u8,
}

impl<'a> PanelLoader<'a> {
    pub fn new(columns: &'a ColumnMapping, delimiter: u8) -> Self {
        Self { columns, delimiter }
    }

    pub fn load_bytes(&self, data: &[u8]) -> Result<PanelTable> {
        self.load(data)
    }

    pub fn load<R: Read>(&self, reader: R) -> Result<PanelTable> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let index = ColumnIndex::resolve(reader.headers()?, self.columns)?;
        tracing::debug!("Resolved panel columns: {:?}", index);

        let mut table = PanelTable::default();
        for (row_idx, result) in reader.records().enumerate() {
            let row = result?;

            let person_id = non_empty(row.get(index.person_id)).and_then(PersonId::parse);
            let wave = non_empty(row.get(index.wave)).and_then(parse_integral);
            let (Some(person_id), Some(wave)) = (person_id, wave) else {
                // +2: one for the header, one for 1-based numbering.
                tracing::debug!("Skipping row {}: missing person id or wave", row_idx + 2);
                table.skipped_rows += 1;
                continue;
            };

            table.records.push(PanelRecord {
                person_id,
                wave,
                union_status: non_empty(row.get(index.union)).and_then(parse_union_status),
                wage: non_empty(row.get(index.wage)).and_then(parse_wage),
                sex: non_empty(row.get(index.sex)).map(str::to_string),
            });
        }

        if table.skipped_rows > 0 {
            tracing::warn!(
                "Skipped {} rows without a usable '{}' or '{}'",
                table.skipped_rows,
                self.columns.person_id,
                self.columns.wave
            );
        }
        Ok(table)
    }
}

//! Group means of the wage change feeding the two charts.
//!
//! Means skip missing outcomes. A group whose rows are all missing has a `None`
//! mean, which the charts draw as a gap.

use crate::domain::model::{cell_label, DidRecord, Gender, Group, CELLS};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
struct MeanAccumulator {
    sum: f64,
    finite: usize,
    rows: usize,
}

impl MeanAccumulator {
    fn add(&mut self, value: Option<f64>) {
        self.rows += 1;
        if let Some(v) = value.filter(|v| v.is_finite()) {
            self.sum += v;
            self.finite += 1;
        }
    }

    fn mean(&self) -> Option<f64> {
        (self.finite > 0).then(|| self.sum / self.finite as f64)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CellMean {
    pub gender: Gender,
    pub group: Group,
    pub label: String,
    pub mean: Option<f64>,
    pub rows: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WavePoint {
    pub wave: i64,
    pub mean: Option<f64>,
    pub rows: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WaveSeries {
    pub gender: Gender,
    pub group: Group,
    pub label: String,
    pub points: Vec<WavePoint>,
}

fn in_cell(record: &DidRecord, gender: Gender, group: Group) -> bool {
    record.gender == gender && record.group == group
}

/// Mean wage change for the four cells, always in [`CELLS`] order.
pub fn cell_means(records: &[DidRecord]) -> Vec<CellMean> {
    CELLS
        .iter()
        .map(|&(gender, group)| {
            let mut acc = MeanAccumulator::default();
            for record in records.iter().filter(|r| in_cell(r, gender, group)) {
                acc.add(record.dwage);
            }
            CellMean {
                gender,
                group,
                label: cell_label(gender, group),
                mean: acc.mean(),
                rows: acc.rows,
            }
        })
        .collect()
}

/// One series per cell with any rows, points ordered by post wave.
pub fn wave_series(records: &[DidRecord]) -> Vec<WaveSeries> {
    CELLS
        .iter()
        .filter_map(|&(gender, group)| {
            let mut by_wave: BTreeMap<i64, MeanAccumulator> = BTreeMap::new();
            for record in records.iter().filter(|r| in_cell(r, gender, group)) {
                by_wave
                    .entry(record.transition.wave_post)
                    .or_default()
                    .add(record.dwage);
            }
            if by_wave.is_empty() {
                return None;
            }
            let points = by_wave
                .into_iter()
                .map(|(wave, acc)| WavePoint {
                    wave,
                    mean: acc.mean(),
                    rows: acc.rows,
                })
                .collect();
            Some(WaveSeries {
                gender,
                group,
                label: cell_label(gender, group),
                points,
            })
        })
        .collect()
}

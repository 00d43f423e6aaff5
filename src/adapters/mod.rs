// Adapters layer: concrete implementations for external systems (panel files, storage, charts).

pub mod charts;
pub mod panel_csv;
pub mod storage;

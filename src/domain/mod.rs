// Domain layer: panel and DiD data types plus the ports the pipeline is built on.

pub mod model;
pub mod ports;

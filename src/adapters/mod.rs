//! Concrete adapter implementations for ports.

pub mod constant_oracle;
pub mod csv_adapter;
pub mod csv_report_adapter;
pub mod file_config_adapter;
pub mod logistic_oracle;
pub mod synthetic_feed;

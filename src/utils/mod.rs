//! Utility functions and types

pub mod data_loader;

pub use data_loader::{
    load_csv, load_table, parse_csv, save_csv, save_table, table_from_csv_bytes, table_from_dataframe,
};

//! tabv: a tui tabular data browser. Loads flat record sets from CSV,
//! Parquet or Arrow files and derives a searched, filtered, sorted and
//! paginated view of them, with CSV export in the on-screen order.

pub mod controller;
pub mod data;
pub mod domain;
pub mod export;
pub mod inputter;
pub mod model;
pub mod session;
pub mod ui;
pub mod view;

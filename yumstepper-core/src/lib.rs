// src/lib.rs

pub mod db;
pub mod quota;
pub mod repositories;
pub mod services;
pub mod test_utils;

pub use db::Database;
pub use services::LedgerServices;
pub use yumstepper_common::error::Error;
pub use yumstepper_common::models;

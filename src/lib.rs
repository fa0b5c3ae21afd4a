#![crate_type = "lib"]
#![crate_name = "minnowdb"]

pub mod common;
pub mod concurrency;
pub mod config;
pub mod sql;
pub mod storage;
pub mod types;

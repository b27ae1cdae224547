// Library for the daemon binary and integration tests

pub mod config;
pub mod counters;
pub mod error;
pub mod history;
pub mod models;
pub mod monitors;
pub mod process_repo;
pub mod shutdown;
pub mod smc;
pub mod version;
pub mod widget;
pub mod worker;

pub mod cache;
pub mod config;
pub mod logging;
pub mod remote;
pub mod storage;

pub mod burst;
pub mod classify;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod logging;
pub mod report;
pub mod single;

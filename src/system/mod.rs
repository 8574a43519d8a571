//! System services: clocks, SoftDevice and the companion link

pub mod bluetooth;
pub mod config;

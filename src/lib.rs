//! Sunshine watch face for the PineTime
//!
//! Digital clock with the date and a weather summary pushed from a paired
//! phone. The library holds the platform independent parts: the lifecycle
//! [`engine`], the companion [`sync`] protocol, the [`icon`] pipeline and the
//! [`ui`] layout. The firmware binary wires them to the hardware.

#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

pub mod config;
pub mod engine;
pub mod icon;
pub mod state;
pub mod sync;
pub mod time;
pub mod ui;

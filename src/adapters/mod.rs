//! Adapters: concrete implementations of the ports.

pub mod duitku;
pub mod http;
pub mod memory;
pub mod postgres;

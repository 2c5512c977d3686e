//! Kasir Billing - Subscription Payment Engine
//!
//! Turns untrusted payment-gateway notifications into exactly-once upgrades
//! of a tenant's subscription state. Ships a Duitku provider behind a
//! provider-agnostic gateway.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

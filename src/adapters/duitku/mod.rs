//! Duitku payment gateway adapter.

mod provider;
pub mod signature;
mod wire;

pub use provider::{DuitkuConfig, DuitkuMode, DuitkuProvider, EndpointGeneration};
pub use wire::DuitkuCallbackForm;

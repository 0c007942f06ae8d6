// Library exports for integration tests and embedding applications

pub mod catalog;
pub mod config;
pub mod error;
pub mod events;
pub mod logging;
pub mod upload;
pub mod validation;

pub use error::{Result, StorefrontError};

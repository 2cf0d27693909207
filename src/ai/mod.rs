#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! The multi-provider completion layer.
//!
//! The grading pipeline hands this module an assembled prompt and gets back
//! completion text, regardless of which AI vendor ultimately served the
//! request. Vendors sit behind the [`provider::ProviderClient`] trait, the
//! [`factory`] builds the ordered credentialed subset from configuration, and
//! the [`fallback::FallbackSession`] switches vendors when one reports
//! exhausted quota or a bad credential.

/// Data-driven classification of vendor failures into abstract kinds.
pub mod classify;
/// Error types for the completion layer.
pub mod error;
/// Construction of the ordered provider client list from configuration.
pub mod factory;
/// The fallback orchestrator and its session state.
pub mod fallback;
/// The provider trait and the concrete vendor clients.
pub mod provider;

pub use error::{CompletionError, ErrorKind, FactoryError, FallbackError};
pub use factory::build_clients;
pub use fallback::FallbackSession;
pub use provider::{ProviderClient, ProviderDescriptor, ProviderKind};

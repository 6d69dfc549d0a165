//! Core of the mobile stock operation wizards
//!
//! This crate holds the document model, validation gates, residual quantity
//! and serial range arithmetic, and session persistence shared by the GraphQL
//! client and the browser (WASM) bindings.

pub mod builder;
pub mod error;
pub mod models;
pub mod remote;
pub mod residual;
pub mod serial;
pub mod session;
pub mod types;
pub mod validation;

pub use builder::TransactionBuilder;
pub use error::*;
pub use models::*;
pub use remote::RemoteDataService;
pub use residual::{ResidualQuantity, ResidualQuantityCalculator};
pub use serial::*;
pub use session::*;
pub use types::*;
pub use validation::*;

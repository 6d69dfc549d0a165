//! Networked side of the stock wizards
//!
//! A GraphQL [`RemoteDataService`](stock_wizard_shared::RemoteDataService),
//! configuration loading and tracing setup for hosts running the wizards.

pub mod config;
pub mod error;
pub mod graphql;
pub mod queries;
pub mod telemetry;

pub use config::{ClientConfig, RemoteConfig, SessionConfig};
pub use error::{ClientError, GraphQlError};
pub use graphql::{decode_response, decode_submission, GraphQlRemote};
pub use telemetry::init_tracing;

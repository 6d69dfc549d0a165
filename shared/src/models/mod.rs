//! Domain models for the stock wizards

mod allocation;
mod document;
mod line;
mod stock;
mod submission;

pub use allocation::*;
pub use document::*;
pub use line::*;
pub use stock::*;
pub use submission::*;

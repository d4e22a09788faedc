//! API request handlers

mod health;
mod model;

pub use health::*;
pub use model::*;

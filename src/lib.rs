pub mod auth;
pub mod config;
pub mod error;
pub mod graph;
pub mod session;
pub mod terminal;

pub use error::{Error, Result};

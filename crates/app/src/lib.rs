#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]

pub mod context;
pub mod log;
mod service;
mod settings;

pub use context::AuthContext;
pub use service::Service;
pub use settings::*;

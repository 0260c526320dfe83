#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]

mod error;
mod exercise;
mod favorite;
mod name;
mod progress;
mod service;
mod session;
mod training_plan;
mod user;

pub use error::*;
pub use exercise::*;
pub use favorite::*;
pub use name::*;
pub use progress::*;
pub use service::*;
pub use session::*;
pub use training_plan::*;
pub use user::*;

#![forbid(unsafe_code)]

pub mod ai_evaluation;
pub mod error;
pub mod model;
pub mod notification;
pub mod phase;
pub mod quiz;
pub mod route;
pub mod student;
pub mod time;

pub use error::Error;
pub use time::Clock;

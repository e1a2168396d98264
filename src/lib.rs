pub mod config;
pub mod coordinator;
pub mod display;
pub mod error;
pub mod screen;
pub mod sensor;
pub mod state;
pub mod storage;
pub mod util;
pub mod weather;

pub use error::{Error, Result};

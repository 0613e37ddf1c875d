pub mod coding;
pub mod config;
pub mod error;

pub use coding::{Coder, DynCoder, Media, Registry, ResultBundle};
pub use config::CodingConfig;
pub use error::{Error, Result};

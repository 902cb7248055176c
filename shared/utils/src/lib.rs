pub mod config;
pub mod error;
pub mod expiry;
pub mod logging;
pub mod validation;

pub use self::config::*;
pub use error::*;
pub use expiry::*;
pub use logging::*;
pub use validation::*;

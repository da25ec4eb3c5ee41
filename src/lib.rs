pub mod bridge;
pub mod config;
pub mod encoding;
pub mod error;
pub mod object;
pub mod script;

pub use bridge::{Bridge, Session, Target};
pub use config::BridgeConfig;
pub use error::{BridgeError, Result};

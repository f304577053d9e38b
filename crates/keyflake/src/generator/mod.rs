mod config;
mod snowflake;

pub use config::*;
pub use snowflake::*;

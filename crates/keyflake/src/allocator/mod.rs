mod atomic;
mod basic;
mod buffered;
mod interface;
mod lock;
mod mutex;
mod state;
mod status;
#[cfg(test)]
mod tests;

pub use atomic::*;
pub use basic::*;
pub use buffered::*;
pub use interface::*;
pub use lock::*;
pub use mutex::*;
pub use state::*;
pub use status::*;

mod cached;
mod interface;
mod source;
mod system;
mod unit;

pub use cached::*;
pub use interface::*;
pub use source::*;
pub use system::*;
pub use unit::*;

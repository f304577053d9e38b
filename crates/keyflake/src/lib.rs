#![doc = include_str!("../README.md")]

mod allocator;
mod error;
mod generator;
mod identity;
mod layout;
mod time;
mod unique;

pub use crate::allocator::*;
pub use crate::error::*;
pub use crate::generator::*;
pub use crate::identity::*;
pub use crate::layout::*;
pub use crate::time::*;
pub use crate::unique::*;

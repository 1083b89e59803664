//!
//! Packets and their annotations.
//!

mod packet;
pub use packet::*;

mod tags;
pub use tags::*;

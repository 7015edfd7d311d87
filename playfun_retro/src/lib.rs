//! Headless loading and stepping of libretro emulation cores.
//!
//! This crate opens a core shared object at runtime, resolves the libretro
//! entry points, and exposes a typed facade for the pieces a search driver
//! needs: core/ROM lifecycle, advancing exactly one frame, opaque state
//! serialization, and access to the region the core reports as system RAM.
//!
//! Cores are not thread safe and call back into the frontend through plain
//! function pointers, so at most one [RetroCore] may be live per thread and
//! all methods must be called from the thread that loaded it.

#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub use error::*;
pub use wrapper::*;

mod abi;
mod callbacks;
mod error;
mod wrapper;

/// Joypad input bitmask, one byte per port per frame.
///
/// Bits from MSB to LSB are Right, Left, Down, Up, Start, Select, B, A.
pub mod input {
    /// A button.
    pub const A: u8 = 0x01;
    /// B button.
    pub const B: u8 = 0x02;
    /// Select button.
    pub const SELECT: u8 = 0x04;
    /// Start button.
    pub const START: u8 = 0x08;
    /// D-pad up.
    pub const UP: u8 = 0x10;
    /// D-pad down.
    pub const DOWN: u8 = 0x20;
    /// D-pad left.
    pub const LEFT: u8 = 0x40;
    /// D-pad right.
    pub const RIGHT: u8 = 0x80;
}

//! Emulator frontend for input-sequence search.
//!
//! Sits on top of [playfun_retro] and owns everything a search driver needs
//! per frame: a canonical 256×256 RGBA view of the last frame, the last
//! frame's mono audio, joypad input application, raw and compressed state
//! snapshots, and a bounded memo table that short-circuits emulator steps the
//! search has already taken ([StateCache]).
//!
//! Most callers go through the process-wide facade in [emu], which mirrors
//! the [Frontend] surface and is a no-op before initialization.

#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub use cache::{CacheStats, StateCache};
pub use codec::{decode_state, encode_state};
pub use error::*;
pub use frontend::{find_default_core, Frontend, FRAME_HEIGHT, FRAME_WIDTH};

pub mod emu;

mod cache;
mod codec;
mod error;
mod frontend;

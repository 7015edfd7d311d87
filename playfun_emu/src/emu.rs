//! Process-wide frontend facade.
//!
//! The search driver treats the emulator as ambient state: one frontend per
//! process, explicit [initialize]/[shutdown], and every other operation safe
//! to call at any time. Before initialization (and after shutdown) each
//! operation is a no-op returning empty or zero.

use once_cell::sync::Lazy;
use std::sync::Mutex;

use crate::{CacheStats, Frontend, InitError};

static FRONTEND: Lazy<Mutex<Option<Frontend>>> = Lazy::new(|| Mutex::new(None));

fn with<R>(default: R, f: impl FnOnce(&mut Frontend) -> R) -> R {
    match FRONTEND.lock().unwrap().as_mut() {
        Some(frontend) => f(frontend),
        None => default,
    }
}

/// Load `core_path` and `rom_path` into the process-wide frontend.
///
/// Fails if the frontend is already initialized, or on any core/ROM load
/// error.
///
/// # Safety
///
/// Same contract as [Frontend::new]: the core executes arbitrary code, and
/// every facade call must come from this thread.
pub unsafe fn initialize(core_path: &str, rom_path: &str) -> Result<(), InitError> {
    let mut slot = FRONTEND.lock().unwrap();
    if slot.is_some() {
        return Err(InitError::AlreadyInitialized);
    }
    *slot = Some(Frontend::new(core_path, rom_path)?);
    Ok(())
}

/// [initialize] with the first core found in the default locations.
///
/// # Safety
///
/// Same contract as [initialize].
pub unsafe fn initialize_with_default_core(rom_path: &str) -> Result<(), InitError> {
    let mut slot = FRONTEND.lock().unwrap();
    if slot.is_some() {
        return Err(InitError::AlreadyInitialized);
    }
    *slot = Some(Frontend::with_default_core(rom_path)?);
    Ok(())
}

/// Unload the ROM and core and drop the cache. Idempotent.
pub fn shutdown() {
    *FRONTEND.lock().unwrap() = None;
}

/// One frame with `input` on controller 0.
pub fn step(input: u8) {
    with((), |frontend| frontend.step(input));
}

/// See [Frontend::step_full].
pub fn step_full(input: u8) {
    with((), |frontend| frontend.step_full(input));
}

/// Copy of system RAM, empty when uninitialized.
pub fn memory() -> Vec<u8> {
    with(Vec::new(), |frontend| frontend.memory())
}

/// Copy of the canonical RGBA frame, empty when uninitialized.
pub fn image() -> Vec<u8> {
    with(Vec::new(), |frontend| frontend.image())
}

/// Copy of the last frame's mono samples, empty when uninitialized.
pub fn sound() -> Vec<i16> {
    with(Vec::new(), |frontend| frontend.sound())
}

/// 64-bit content hash of system RAM, 0 when uninitialized.
pub fn ram_checksum() -> u64 {
    with(0, |frontend| frontend.ram_checksum())
}

/// Serialized state size, 0 when uninitialized.
pub fn state_size() -> usize {
    with(0, |frontend| frontend.state_size())
}

/// Raw state snapshot, empty when uninitialized.
pub fn save_uncompressed() -> Vec<u8> {
    with(Vec::new(), |frontend| frontend.save_uncompressed())
}

/// Restore a raw state snapshot.
pub fn load_uncompressed(state: &[u8]) {
    with((), |frontend| frontend.load_uncompressed(state));
}

/// Raw snapshot for use as a compression basis.
pub fn basis() -> Vec<u8> {
    with(Vec::new(), |frontend| frontend.basis())
}

/// Compressed state snapshot, empty when uninitialized.
pub fn save() -> Vec<u8> {
    with(Vec::new(), |frontend| frontend.save())
}

/// Restore a compressed snapshot.
pub fn load(data: &[u8]) {
    with((), |frontend| frontend.load(data));
}

/// Compressed snapshot delta-encoded against `basis`.
pub fn save_ex(basis: Option<&[u8]>) -> Vec<u8> {
    with(Vec::new(), |frontend| frontend.save_ex(basis))
}

/// Restore a snapshot taken by [save_ex] with the same basis.
pub fn load_ex(data: &[u8], basis: Option<&[u8]>) {
    with((), |frontend| frontend.load_ex(data, basis));
}

/// Memoized step; see [Frontend::caching_step].
pub fn caching_step(input: u8) {
    with((), |frontend| frontend.caching_step(input));
}

/// Drop cached steps and set new cache bounds.
pub fn reset_cache(limit: u64, slop: u64) {
    with((), |frontend| frontend.reset_cache(limit, slop));
}

/// Step-cache counters, `None` when uninitialized.
pub fn cache_stats() -> Option<CacheStats> {
    with(None, |frontend| Some(frontend.cache_stats()))
}

/// Print the step-cache counters to stdout.
pub fn print_cache_stats() {
    if let Some(stats) = cache_stats() {
        println!("{}", stats);
    }
}

/// Core name, empty when uninitialized.
pub fn core_name() -> String {
    with(String::new(), |frontend| frontend.core_name().to_string())
}

/// Core version, empty when uninitialized.
pub fn core_version() -> String {
    with(String::new(), |frontend| {
        frontend.core_version().to_string()
    })
}

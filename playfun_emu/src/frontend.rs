//! The frontend instance: one loaded core, one ROM, and the per-frame
//! buffers and caches the search reads.

use std::{
    collections::hash_map::DefaultHasher,
    env,
    hash::Hasher,
    path::Path,
    sync::{Arc, Mutex},
};

use playfun_retro::{FrameBuffer, RetroCore};

use crate::{
    cache::{CacheStats, StateCache},
    codec::{decode_state, encode_state},
    InitError,
};

/// Canonical frame width in pixels.
pub const FRAME_WIDTH: usize = 256;
/// Canonical frame height in pixels.
pub const FRAME_HEIGHT: usize = 256;
const FRAME_BYTES: usize = FRAME_WIDTH * FRAME_HEIGHT * 4;

// Probed in order by [Frontend::with_default_core].
const DEFAULT_CORE_PATHS: &[&str] = &[
    "/tmp/fceumm_libretro.so",
    "/usr/lib/libretro/fceumm_libretro.so",
    "/usr/local/lib/libretro/fceumm_libretro.so",
    "~/.config/retroarch/cores/fceumm_libretro.so",
    "./fceumm_libretro.so",
];

fn expand_home(path: &str) -> String {
    match path.strip_prefix('~') {
        Some(rest) => match env::var("HOME") {
            Ok(home) => format!("{}{}", home, rest),
            // Without HOME the literal path is probed (and normally misses).
            Err(_) => path.to_string(),
        },
        None => path.to_string(),
    }
}

/// The first default core location that exists, `~` expanded via `HOME`.
pub fn find_default_core() -> Option<String> {
    DEFAULT_CORE_PATHS
        .iter()
        .map(|path| expand_home(path))
        .find(|path| Path::new(path).exists())
}

/// A core with a loaded ROM plus the canonical frame/audio buffers and the
/// step cache.
///
/// Most drivers use the process-wide facade in [crate::emu] instead of
/// holding a `Frontend` directly.
#[derive(Debug)]
pub struct Frontend {
    core: RetroCore,
    cache: StateCache,
    frame_rgba: Arc<Mutex<Vec<u8>>>,
    audio_mono: Arc<Mutex<Vec<i16>>>,
}

impl Frontend {
    /// Load the core at `core_path`, load `rom_path` into it, and register
    /// the frame/audio conversion sinks.
    ///
    /// # Safety
    ///
    /// Same contract as [RetroCore::load]: the core executes arbitrary code
    /// and must stay on this thread.
    pub unsafe fn new(core_path: &str, rom_path: &str) -> Result<Self, InitError> {
        let mut core =
            RetroCore::load(core_path).map_err(|error| InitError::CoreLoadError {
                core_path: core_path.to_string(),
                error,
            })?;
        let info = core.core_info();
        log::info!(
            "loaded core {} v{}",
            info.library_name,
            info.library_version
        );

        core.load_rom(rom_path)?;

        let frame_rgba = Arc::new(Mutex::new(vec![0u8; FRAME_BYTES]));
        let audio_mono = Arc::new(Mutex::new(Vec::new()));

        let frame_sink = Arc::clone(&frame_rgba);
        core.set_video_sink(Box::new(move |frame| {
            convert_frame(frame, &mut frame_sink.lock().unwrap());
        }));

        let audio_sink = Arc::clone(&audio_mono);
        core.set_audio_sink(Box::new(move |samples| {
            downmix(samples, &mut audio_sink.lock().unwrap());
        }));

        Ok(Self {
            core,
            cache: StateCache::new(0, 10_000),
            frame_rgba,
            audio_mono,
        })
    }

    /// Load a ROM using the first core found in the default locations.
    ///
    /// # Safety
    ///
    /// Same contract as [Frontend::new].
    pub unsafe fn with_default_core(rom_path: &str) -> Result<Self, InitError> {
        let core_path = find_default_core().ok_or(InitError::NoDefaultCore)?;
        Self::new(&core_path, rom_path)
    }

    /// Apply `input` to controller 0 (controller 1 held at zero) and run one
    /// frame.
    pub fn step(&mut self, input: u8) {
        self.core.set_input(0, input);
        self.core.set_input(1, 0);
        self.core.run();
    }

    /// Same as [step](Self::step); the conversion sinks capture video and
    /// audio unconditionally.
    pub fn step_full(&mut self, input: u8) {
        self.step(input);
    }

    /// Copy of system RAM (2048 bytes on NES cores), empty when the core
    /// reports none.
    pub fn memory(&self) -> Vec<u8> {
        self.core.system_ram().to_vec()
    }

    /// Copy of the canonical 256×256 RGBA frame from the last completed
    /// video refresh.
    pub fn image(&self) -> Vec<u8> {
        self.frame_rgba.lock().unwrap().clone()
    }

    /// Copy of the last frame's mono samples.
    pub fn sound(&self) -> Vec<i16> {
        self.audio_mono.lock().unwrap().clone()
    }

    /// 64-bit content hash of system RAM, 0 when RAM is unavailable.
    pub fn ram_checksum(&self) -> u64 {
        let ram = self.core.system_ram();
        if ram.is_empty() {
            return 0;
        }
        let mut hasher = DefaultHasher::new();
        hasher.write(ram);
        hasher.finish()
    }

    /// Size of the core's serialized state in bytes.
    pub fn state_size(&self) -> usize {
        self.core.serialize_size()
    }

    /// Serialize the current state, raw.
    pub fn save_uncompressed(&mut self) -> Vec<u8> {
        let mut state = vec![0u8; self.core.serialize_size()];
        // A failed serialize is survivable; callers treat the buffer as
        // best-effort.
        self.core.save_state(&mut state);
        state
    }

    /// Restore a state from [save_uncompressed](Self::save_uncompressed).
    /// Empty input is a no-op.
    pub fn load_uncompressed(&mut self, state: &[u8]) {
        if state.is_empty() {
            return;
        }
        self.core.load_state(state);
    }

    /// Alias for [save_uncompressed](Self::save_uncompressed); the result is
    /// what callers pass as a compression basis.
    pub fn basis(&mut self) -> Vec<u8> {
        self.save_uncompressed()
    }

    /// Compressed snapshot of the current state.
    pub fn save(&mut self) -> Vec<u8> {
        self.save_ex(None)
    }

    /// Restore a snapshot from [save](Self::save).
    pub fn load(&mut self, data: &[u8]) {
        self.load_ex(data, None);
    }

    /// Compressed snapshot, delta-encoded against `basis` when present.
    pub fn save_ex(&mut self, basis: Option<&[u8]>) -> Vec<u8> {
        let raw = self.save_uncompressed();
        encode_state(&raw, basis)
    }

    /// Restore a snapshot from [save_ex](Self::save_ex) taken with the same
    /// basis. Inputs shorter than the length prefix are ignored.
    pub fn load_ex(&mut self, data: &[u8], basis: Option<&[u8]>) {
        if let Some(raw) = decode_state(data, basis) {
            self.load_uncompressed(&raw);
        }
    }

    /// [step](Self::step), memoized on (current state, `input`).
    ///
    /// A cache hit restores the recorded post-step state instead of running
    /// the core; a miss runs the core and records the transition.
    pub fn caching_step(&mut self, input: u8) {
        let start = self.save_uncompressed();
        if let Some(known) = self.cache.get_known(input, &start) {
            // Copy out of the cache before taking &mut self again.
            let post = known.to_vec();
            self.load_uncompressed(&post);
        } else {
            self.step(input);
            let result = self.save_uncompressed();
            self.cache.remember(input, &start, &result);
        }
    }

    /// Drop all cached steps and set new bounds.
    pub fn reset_cache(&mut self, limit: u64, slop: u64) {
        self.cache.resize(limit, slop);
    }

    /// Step-cache counters.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Core name as reported at load.
    pub fn core_name(&self) -> &str {
        &self.core.core_info().library_name
    }

    /// Core version as reported at load.
    pub fn core_version(&self) -> &str {
        &self.core.core_info().library_version
    }
}

/// Convert whatever geometry the core reports into the canonical 256×256
/// RGBA frame.
///
/// The source is treated as XRGB8888: for each pixel in the window the
/// bytes are reversed to RGB and alpha forced opaque. Pixels past the
/// reported width or height stay (0, 0, 0, 0).
fn convert_frame(frame: &FrameBuffer<'_>, out: &mut Vec<u8>) {
    out.clear();
    out.resize(FRAME_BYTES, 0);

    let height = (frame.height as usize).min(FRAME_HEIGHT);
    let width = (frame.width as usize).min(FRAME_WIDTH);
    for y in 0..height {
        for x in 0..width {
            let src = y * frame.pitch + x * 4;
            if src + 3 >= frame.data.len() {
                continue;
            }
            let dst = (y * FRAME_WIDTH + x) * 4;
            out[dst] = frame.data[src + 2];
            out[dst + 1] = frame.data[src + 1];
            out[dst + 2] = frame.data[src];
            out[dst + 3] = 0xFF;
        }
    }
}

/// Average interleaved stereo pairs down to mono.
fn downmix(stereo: &[i16], out: &mut Vec<i16>) {
    out.clear();
    out.reserve(stereo.len() / 2);
    for pair in stereo.chunks_exact(2) {
        out.push(((pair[0] as i32 + pair[1] as i32) / 2) as i16);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_conversion_reverses_bgra_and_pads_with_zeros() {
        // A 2x1 source frame with padding pitch.
        let data = [
            0x11, 0x22, 0x33, 0x00, // pixel (0,0): B G R X
            0x44, 0x55, 0x66, 0x00, // pixel (1,0)
            0xAA, 0xAA, 0xAA, 0xAA, // pitch padding, never read
        ];
        let frame = FrameBuffer {
            data: &data,
            width: 2,
            height: 1,
            pitch: 12,
        };
        let mut out = Vec::new();
        convert_frame(&frame, &mut out);

        assert_eq!(out.len(), FRAME_BYTES);
        assert_eq!(&out[0..4], &[0x33, 0x22, 0x11, 0xFF]);
        assert_eq!(&out[4..8], &[0x66, 0x55, 0x44, 0xFF]);
        // Column past the reported width, and the whole second row, are zero.
        assert_eq!(&out[8..12], &[0, 0, 0, 0]);
        assert_eq!(&out[FRAME_WIDTH * 4..FRAME_WIDTH * 4 + 4], &[0, 0, 0, 0]);
    }

    #[test]
    fn downmix_averages_stereo_pairs() {
        let mut out = Vec::new();
        downmix(&[100, 200, -100, 100, i16::MAX, i16::MAX], &mut out);
        assert_eq!(out, vec![150, 0, i16::MAX]);
    }

    #[test]
    fn home_expansion_uses_the_environment() {
        // Only paths starting with ~ are rewritten.
        assert_eq!(expand_home("/tmp/core.so"), "/tmp/core.so");
        if let Ok(home) = env::var("HOME") {
            assert_eq!(expand_home("~/x.so"), format!("{}/x.so", home));
        }
    }
}

//! Loading a core shared object and driving it one frame at a time.

use std::{
    ffi::{CStr, CString},
    fmt, fs, mem,
    os::raw::{c_char, c_void},
    ptr, slice,
    sync::Arc,
};

use dlopen::raw::Library;

use crate::{
    abi::{
        ApiVersionFn, DeinitFn, GetMemoryDataFn, GetMemorySizeFn, GetSystemAvInfoFn,
        GetSystemInfoFn, InitFn, LoadGameFn, ResetFn, RetroGameInfo, RetroSystemAvInfo,
        RetroSystemInfo, RunFn, SerializeFn, SerializeSizeFn, SetAudioSampleBatchFn,
        SetAudioSampleFn, SetControllerPortDeviceFn, SetEnvironmentFn, SetInputPollFn,
        SetInputStateFn, SetVideoRefreshFn, UnloadGameFn, UnserializeFn, API_VERSION,
        DEVICE_JOYPAD, MEMORY_SYSTEM_RAM,
    },
    callbacks::{self, Session},
    CoreLoadError, RomLoadError,
};

/// One video frame as handed over by the core, valid only during the
/// video-refresh callback.
#[derive(Debug)]
pub struct FrameBuffer<'a> {
    /// Raw pixel rows, `height * pitch` bytes in the core's pixel format.
    pub data: &'a [u8],
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Bytes per row.
    pub pitch: usize,
}

/// Identity reported by the core.
#[derive(Debug, Clone)]
pub struct CoreInfo {
    /// Human-readable core name.
    pub library_name: String,
    /// Core version string.
    pub library_version: String,
    /// Pipe-separated ROM extensions the core accepts.
    pub valid_extensions: String,
    /// Whether the core wants a path instead of in-memory ROM data.
    pub need_fullpath: bool,
    /// Whether archives must be passed through unextracted.
    pub block_extract: bool,
}

/// Geometry and timing reported by the core once a ROM is loaded.
#[derive(Debug, Clone, Copy)]
pub struct AvInfo {
    /// Nominal frame width in pixels.
    pub base_width: u32,
    /// Nominal frame height in pixels.
    pub base_height: u32,
    /// Maximum frame width in pixels.
    pub max_width: u32,
    /// Maximum frame height in pixels.
    pub max_height: u32,
    /// Display aspect ratio, 0 when unspecified.
    pub aspect_ratio: f32,
    /// Frames per second.
    pub fps: f64,
    /// Audio sample rate in Hz.
    pub sample_rate: f64,
}

struct Symbols {
    init: InitFn,
    deinit: DeinitFn,
    api_version: ApiVersionFn,
    get_system_info: GetSystemInfoFn,
    get_system_av_info: GetSystemAvInfoFn,
    set_environment: SetEnvironmentFn,
    set_video_refresh: SetVideoRefreshFn,
    set_audio_sample: SetAudioSampleFn,
    set_audio_sample_batch: SetAudioSampleBatchFn,
    set_input_poll: SetInputPollFn,
    set_input_state: SetInputStateFn,
    set_controller_port_device: SetControllerPortDeviceFn,
    reset: ResetFn,
    run: RunFn,
    serialize_size: SerializeSizeFn,
    serialize: SerializeFn,
    unserialize: UnserializeFn,
    load_game: LoadGameFn,
    unload_game: UnloadGameFn,
    get_memory_data: GetMemoryDataFn,
    get_memory_size: GetMemorySizeFn,
}

impl Symbols {
    unsafe fn resolve(library: &Library) -> Result<Self, CoreLoadError> {
        Ok(Self {
            init: sym(library, "retro_init")?,
            deinit: sym(library, "retro_deinit")?,
            api_version: sym(library, "retro_api_version")?,
            get_system_info: sym(library, "retro_get_system_info")?,
            get_system_av_info: sym(library, "retro_get_system_av_info")?,
            set_environment: sym(library, "retro_set_environment")?,
            set_video_refresh: sym(library, "retro_set_video_refresh")?,
            set_audio_sample: sym(library, "retro_set_audio_sample")?,
            set_audio_sample_batch: sym(library, "retro_set_audio_sample_batch")?,
            set_input_poll: sym(library, "retro_set_input_poll")?,
            set_input_state: sym(library, "retro_set_input_state")?,
            set_controller_port_device: sym(library, "retro_set_controller_port_device")?,
            reset: sym(library, "retro_reset")?,
            run: sym(library, "retro_run")?,
            serialize_size: sym(library, "retro_serialize_size")?,
            serialize: sym(library, "retro_serialize")?,
            unserialize: sym(library, "retro_unserialize")?,
            load_game: sym(library, "retro_load_game")?,
            unload_game: sym(library, "retro_unload_game")?,
            get_memory_data: sym(library, "retro_get_memory_data")?,
            get_memory_size: sym(library, "retro_get_memory_size")?,
        })
    }
}

/// Resolve `name` to a typed entry point.
///
/// The dlopen API hands back a raw pointer; the cast to a fn pointer is UB on
/// paper, but there's not really a way to avoid it when calling into a plugin.
unsafe fn sym<T: Copy>(library: &Library, name: &str) -> Result<T, CoreLoadError> {
    let pointer: *const c_void = library
        .symbol(name)
        .map_err(|_| CoreLoadError::UndefinedSymbol(name.to_string()))?;
    Ok(mem::transmute_copy(&pointer))
}

unsafe fn string_at(pointer: *const c_char) -> String {
    if pointer.is_null() {
        String::new()
    } else {
        CStr::from_ptr(pointer).to_string_lossy().into_owned()
    }
}

/// A loaded libretro core with its callback session.
///
/// Dropping unloads the ROM, deinitializes the core, and closes the shared
/// object.
pub struct RetroCore {
    session: Box<Session>,
    audio_sink: Option<Box<dyn FnMut(&[i16]) + Send>>,
    symbols: Symbols,
    core_info: CoreInfo,
    av_info: Option<AvInfo>,
    rom_loaded: bool,
    // Held so the resolved entry points stay valid.
    _library: Library,
}

impl RetroCore {
    /// Open the shared object at `core_path`, resolve the libretro entry
    /// points, register the callback thunks, and initialize the core.
    ///
    /// Fails when the object cannot be opened, a required symbol is missing,
    /// or the core's advertised API version is not the one this adapter
    /// speaks. The shared object is closed on every failure path.
    ///
    /// # Safety
    ///
    /// Loading a core executes arbitrary code from the shared object. Cores
    /// keep global state: loading the same core twice in one process, or
    /// calling into it from more than one thread, is undefined behavior.
    pub unsafe fn load(core_path: &str) -> Result<Self, CoreLoadError> {
        let library = Library::open(core_path)?;
        let symbols = Symbols::resolve(&library)?;

        let version = (symbols.api_version)();
        if version != API_VERSION {
            return Err(CoreLoadError::ApiVersionMismatch { found: version });
        }

        let mut session = Box::new(Session::new());
        callbacks::activate(&mut *session);
        (symbols.set_environment)(callbacks::environment);
        (symbols.set_video_refresh)(callbacks::video_refresh);
        (symbols.set_audio_sample)(callbacks::audio_sample);
        (symbols.set_audio_sample_batch)(callbacks::audio_sample_batch);
        (symbols.set_input_poll)(callbacks::input_poll);
        (symbols.set_input_state)(callbacks::input_state);
        (symbols.init)();

        let mut raw_info = mem::zeroed::<RetroSystemInfo>();
        (symbols.get_system_info)(&mut raw_info);
        let core_info = CoreInfo {
            library_name: string_at(raw_info.library_name),
            library_version: string_at(raw_info.library_version),
            valid_extensions: string_at(raw_info.valid_extensions),
            need_fullpath: raw_info.need_fullpath,
            block_extract: raw_info.block_extract,
        };

        Ok(Self {
            session,
            audio_sink: None,
            symbols,
            core_info,
            av_info: None,
            rom_loaded: false,
            _library: library,
        })
    }

    /// Point the callback thunks at this core's session.
    ///
    /// Called before every entry point that can re-enter the frontend.
    fn activate(&mut self) {
        callbacks::activate(&mut *self.session);
    }

    /// Identity reported by the core at load time.
    pub fn core_info(&self) -> &CoreInfo {
        &self.core_info
    }

    /// Geometry and timing, available once a ROM is loaded.
    pub fn av_info(&self) -> Option<&AvInfo> {
        self.av_info.as_ref()
    }

    /// Whether a ROM is currently loaded.
    pub fn is_rom_loaded(&self) -> bool {
        self.rom_loaded
    }

    /// Read the ROM at `rom_path` and hand it to the core.
    ///
    /// Any previously loaded ROM is unloaded first. On success the controller
    /// kind for both ports is set to joypad and AV info is cached.
    pub fn load_rom(&mut self, rom_path: &str) -> Result<(), RomLoadError> {
        self.unload_rom();

        let rom = fs::read(rom_path).map_err(|error| RomLoadError::ReadError {
            filename: rom_path.to_string(),
            error: Arc::new(error),
        })?;
        // The path is advisory; the core receives the ROM bytes directly.
        let path = CString::new(rom_path).unwrap_or_default();
        let info = RetroGameInfo {
            path: path.as_ptr(),
            data: rom.as_ptr() as *const c_void,
            size: rom.len(),
            meta: ptr::null(),
        };

        self.activate();
        let loaded = unsafe { (self.symbols.load_game)(&info) };
        if !loaded {
            return Err(RomLoadError::Rejected {
                filename: rom_path.to_string(),
            });
        }

        let mut raw = unsafe { mem::zeroed::<RetroSystemAvInfo>() };
        unsafe {
            (self.symbols.get_system_av_info)(&mut raw);
            (self.symbols.set_controller_port_device)(0, DEVICE_JOYPAD);
            (self.symbols.set_controller_port_device)(1, DEVICE_JOYPAD);
        }
        self.av_info = Some(AvInfo {
            base_width: raw.geometry.base_width,
            base_height: raw.geometry.base_height,
            max_width: raw.geometry.max_width,
            max_height: raw.geometry.max_height,
            aspect_ratio: raw.geometry.aspect_ratio,
            fps: raw.timing.fps,
            sample_rate: raw.timing.sample_rate,
        });
        self.rom_loaded = true;
        Ok(())
    }

    /// Unload the current ROM, if any.
    pub fn unload_rom(&mut self) {
        if !self.rom_loaded {
            return;
        }
        self.activate();
        unsafe { (self.symbols.unload_game)() };
        self.rom_loaded = false;
        self.av_info = None;
    }

    /// Install the sink invoked synchronously from the video-refresh callback
    /// during [run](Self::run).
    pub fn set_video_sink(&mut self, sink: Box<dyn FnMut(&FrameBuffer<'_>) + Send>) {
        self.session.video_sink = Some(sink);
    }

    /// Install the sink that receives the frame's interleaved stereo samples,
    /// exactly once, after each [run](Self::run).
    pub fn set_audio_sink(&mut self, sink: Box<dyn FnMut(&[i16]) + Send>) {
        self.audio_sink = Some(sink);
    }

    /// Set the joypad bitmask for `port` (0 or 1).
    pub fn set_input(&mut self, port: usize, mask: u8) {
        if port < 2 {
            self.session.input[port] = mask;
        }
    }

    /// Soft-reset the emulated machine.
    pub fn reset(&mut self) {
        if !self.rom_loaded {
            return;
        }
        self.activate();
        unsafe { (self.symbols.reset)() };
    }

    /// Advance exactly one frame.
    ///
    /// Video and input callbacks fire during the call; the accumulated audio
    /// is dispatched to the audio sink after the core returns.
    pub fn run(&mut self) {
        if !self.rom_loaded {
            return;
        }
        self.activate();
        self.session.audio.clear();
        unsafe { (self.symbols.run)() };

        if let Some(sink) = self.audio_sink.as_mut() {
            if !self.session.audio.is_empty() {
                sink(&self.session.audio);
            }
        }
    }

    /// Size in bytes of the core's serialized state, 0 without a ROM.
    ///
    /// Stable between [run](Self::run) calls; may change across ROM loads.
    pub fn serialize_size(&self) -> usize {
        if !self.rom_loaded {
            return 0;
        }
        unsafe { (self.symbols.serialize_size)() }
    }

    /// Serialize the current state into `out`.
    ///
    /// Returns false without a ROM, when `out` is smaller than
    /// [serialize_size](Self::serialize_size), or when the core reports
    /// failure.
    pub fn save_state(&mut self, out: &mut [u8]) -> bool {
        if !self.rom_loaded || out.len() < self.serialize_size() {
            return false;
        }
        self.activate();
        unsafe { (self.symbols.serialize)(out.as_mut_ptr() as *mut c_void, out.len()) }
    }

    /// Restore a state previously produced by [save_state](Self::save_state).
    ///
    /// Returns false without a ROM or when the core rejects the data.
    pub fn load_state(&mut self, data: &[u8]) -> bool {
        if !self.rom_loaded {
            return false;
        }
        self.activate();
        unsafe { (self.symbols.unserialize)(data.as_ptr() as *const c_void, data.len()) }
    }

    /// The region the core reports as system RAM, empty without a ROM or when
    /// the core reports none.
    ///
    /// The pointer is refetched on every call; the region is not stable
    /// across ROM loads.
    pub fn system_ram(&self) -> &[u8] {
        if !self.rom_loaded {
            return &[];
        }
        unsafe {
            let data = (self.symbols.get_memory_data)(MEMORY_SYSTEM_RAM) as *const u8;
            let size = (self.symbols.get_memory_size)(MEMORY_SYSTEM_RAM);
            if data.is_null() || size == 0 {
                return &[];
            }
            slice::from_raw_parts(data, size)
        }
    }
}

impl Drop for RetroCore {
    fn drop(&mut self) {
        self.unload_rom();
        self.activate();
        unsafe { (self.symbols.deinit)() };
        callbacks::activate(ptr::null_mut());
    }
}

impl fmt::Debug for RetroCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetroCore")
            .field("core_info", &self.core_info)
            .field("rom_loaded", &self.rom_loaded)
            .finish_non_exhaustive()
    }
}

//! Raw libretro ABI: constants, C struct layouts, and entry point signatures.
//!
//! Only the subset of the protocol that a headless frontend exercises is
//! declared here. Layouts match the libretro API version in
//! [API_VERSION]; a core advertising a different version is rejected at load.

use std::os::raw::{c_char, c_uint, c_void};

/// The libretro API version this adapter speaks.
pub(crate) const API_VERSION: c_uint = 1;

pub(crate) const DEVICE_JOYPAD: c_uint = 1;
pub(crate) const MEMORY_SYSTEM_RAM: c_uint = 2;

// Discrete joypad button ids.
pub(crate) const DEVICE_ID_JOYPAD_B: c_uint = 0;
pub(crate) const DEVICE_ID_JOYPAD_SELECT: c_uint = 2;
pub(crate) const DEVICE_ID_JOYPAD_START: c_uint = 3;
pub(crate) const DEVICE_ID_JOYPAD_UP: c_uint = 4;
pub(crate) const DEVICE_ID_JOYPAD_DOWN: c_uint = 5;
pub(crate) const DEVICE_ID_JOYPAD_LEFT: c_uint = 6;
pub(crate) const DEVICE_ID_JOYPAD_RIGHT: c_uint = 7;
pub(crate) const DEVICE_ID_JOYPAD_A: c_uint = 8;
/// Query for all buttons at once, one bit per discrete id.
pub(crate) const DEVICE_ID_JOYPAD_MASK: c_uint = 256;

// Environment commands the adapter answers. Everything else is refused.
pub(crate) const ENVIRONMENT_GET_CAN_DUPE: c_uint = 3;
pub(crate) const ENVIRONMENT_GET_SYSTEM_DIRECTORY: c_uint = 9;
pub(crate) const ENVIRONMENT_SET_PIXEL_FORMAT: c_uint = 10;
pub(crate) const ENVIRONMENT_SET_INPUT_DESCRIPTORS: c_uint = 11;
pub(crate) const ENVIRONMENT_SET_VARIABLES: c_uint = 16;
pub(crate) const ENVIRONMENT_SET_SUPPORT_NO_GAME: c_uint = 18;
pub(crate) const ENVIRONMENT_GET_LOG_INTERFACE: c_uint = 27;
pub(crate) const ENVIRONMENT_GET_CORE_ASSETS_DIRECTORY: c_uint = 30;
pub(crate) const ENVIRONMENT_GET_SAVE_DIRECTORY: c_uint = 31;
pub(crate) const ENVIRONMENT_SET_MEMORY_MAPS: c_uint = 36;

// Pixel formats accepted from SET_PIXEL_FORMAT.
pub(crate) const PIXEL_FORMAT_0RGB1555: c_uint = 0;
pub(crate) const PIXEL_FORMAT_XRGB8888: c_uint = 1;
pub(crate) const PIXEL_FORMAT_RGB565: c_uint = 2;

#[repr(C)]
pub(crate) struct RetroGameInfo {
    pub(crate) path: *const c_char,
    pub(crate) data: *const c_void,
    pub(crate) size: usize,
    pub(crate) meta: *const c_char,
}

#[repr(C)]
pub(crate) struct RetroSystemInfo {
    pub(crate) library_name: *const c_char,
    pub(crate) library_version: *const c_char,
    pub(crate) valid_extensions: *const c_char,
    pub(crate) need_fullpath: bool,
    pub(crate) block_extract: bool,
}

#[repr(C)]
pub(crate) struct RetroGameGeometry {
    pub(crate) base_width: c_uint,
    pub(crate) base_height: c_uint,
    pub(crate) max_width: c_uint,
    pub(crate) max_height: c_uint,
    pub(crate) aspect_ratio: f32,
}

#[repr(C)]
pub(crate) struct RetroSystemTiming {
    pub(crate) fps: f64,
    pub(crate) sample_rate: f64,
}

#[repr(C)]
pub(crate) struct RetroSystemAvInfo {
    pub(crate) geometry: RetroGameGeometry,
    pub(crate) timing: RetroSystemTiming,
}

/// printf-style log sink handed to the core via GET_LOG_INTERFACE.
pub(crate) type RetroLogPrintf =
    unsafe extern "C" fn(level: c_uint, fmt: *const c_char, ...);

#[repr(C)]
pub(crate) struct RetroLogCallback {
    pub(crate) log: RetroLogPrintf,
}

// Frontend callbacks registered with the core.
pub(crate) type EnvironmentFn =
    unsafe extern "C" fn(cmd: c_uint, data: *mut c_void) -> bool;
pub(crate) type VideoRefreshFn =
    unsafe extern "C" fn(data: *const c_void, width: c_uint, height: c_uint, pitch: usize);
pub(crate) type AudioSampleFn = unsafe extern "C" fn(left: i16, right: i16);
pub(crate) type AudioSampleBatchFn =
    unsafe extern "C" fn(data: *const i16, frames: usize) -> usize;
pub(crate) type InputPollFn = unsafe extern "C" fn();
pub(crate) type InputStateFn =
    unsafe extern "C" fn(port: c_uint, device: c_uint, index: c_uint, id: c_uint) -> i16;

// Core entry points, in the order they are resolved.
pub(crate) type InitFn = unsafe extern "C" fn();
pub(crate) type DeinitFn = unsafe extern "C" fn();
pub(crate) type ApiVersionFn = unsafe extern "C" fn() -> c_uint;
pub(crate) type GetSystemInfoFn = unsafe extern "C" fn(info: *mut RetroSystemInfo);
pub(crate) type GetSystemAvInfoFn = unsafe extern "C" fn(info: *mut RetroSystemAvInfo);
pub(crate) type SetEnvironmentFn = unsafe extern "C" fn(cb: EnvironmentFn);
pub(crate) type SetVideoRefreshFn = unsafe extern "C" fn(cb: VideoRefreshFn);
pub(crate) type SetAudioSampleFn = unsafe extern "C" fn(cb: AudioSampleFn);
pub(crate) type SetAudioSampleBatchFn = unsafe extern "C" fn(cb: AudioSampleBatchFn);
pub(crate) type SetInputPollFn = unsafe extern "C" fn(cb: InputPollFn);
pub(crate) type SetInputStateFn = unsafe extern "C" fn(cb: InputStateFn);
pub(crate) type SetControllerPortDeviceFn = unsafe extern "C" fn(port: c_uint, device: c_uint);
pub(crate) type ResetFn = unsafe extern "C" fn();
pub(crate) type RunFn = unsafe extern "C" fn();
pub(crate) type SerializeSizeFn = unsafe extern "C" fn() -> usize;
pub(crate) type SerializeFn = unsafe extern "C" fn(data: *mut c_void, size: usize) -> bool;
pub(crate) type UnserializeFn = unsafe extern "C" fn(data: *const c_void, size: usize) -> bool;
pub(crate) type LoadGameFn = unsafe extern "C" fn(game: *const RetroGameInfo) -> bool;
pub(crate) type UnloadGameFn = unsafe extern "C" fn();
pub(crate) type GetMemoryDataFn = unsafe extern "C" fn(id: c_uint) -> *mut c_void;
pub(crate) type GetMemorySizeFn = unsafe extern "C" fn(id: c_uint) -> usize;

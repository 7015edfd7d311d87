//! Static callback thunks registered with the core.
//!
//! Libretro cores call back through plain `extern "C"` function pointers, so
//! the thunks locate the active session through a thread-local pointer that
//! [crate::RetroCore] re-establishes before every call that can re-enter.
//! Cores are not reentrant, so a single-valued slot per thread is enough.

use std::{
    cell::Cell,
    mem,
    os::raw::{c_char, c_uint, c_void},
    ptr, slice,
};

use crate::{
    abi::{
        RetroLogCallback, RetroLogPrintf, DEVICE_ID_JOYPAD_A, DEVICE_ID_JOYPAD_B,
        DEVICE_ID_JOYPAD_DOWN, DEVICE_ID_JOYPAD_LEFT, DEVICE_ID_JOYPAD_MASK,
        DEVICE_ID_JOYPAD_RIGHT, DEVICE_ID_JOYPAD_SELECT, DEVICE_ID_JOYPAD_START,
        DEVICE_ID_JOYPAD_UP, DEVICE_JOYPAD, ENVIRONMENT_GET_CAN_DUPE,
        ENVIRONMENT_GET_CORE_ASSETS_DIRECTORY, ENVIRONMENT_GET_LOG_INTERFACE,
        ENVIRONMENT_GET_SAVE_DIRECTORY, ENVIRONMENT_GET_SYSTEM_DIRECTORY,
        ENVIRONMENT_SET_INPUT_DESCRIPTORS, ENVIRONMENT_SET_MEMORY_MAPS,
        ENVIRONMENT_SET_PIXEL_FORMAT, ENVIRONMENT_SET_SUPPORT_NO_GAME,
        ENVIRONMENT_SET_VARIABLES, PIXEL_FORMAT_0RGB1555, PIXEL_FORMAT_RGB565,
        PIXEL_FORMAT_XRGB8888,
    },
    input, FrameBuffer,
};

/// Per-core state the thunks operate on.
pub(crate) struct Session {
    /// Joypad bitmask per port.
    pub(crate) input: [u8; 2],
    /// Interleaved stereo samples accumulated during the current `retro_run`.
    pub(crate) audio: Vec<i16>,
    /// Invoked synchronously from the video-refresh callback.
    pub(crate) video_sink: Option<Box<dyn FnMut(&FrameBuffer<'_>) + Send>>,
}

impl Session {
    pub(crate) fn new() -> Self {
        Self {
            input: [0, 0],
            audio: Vec::new(),
            video_sink: None,
        }
    }
}

thread_local! {
    static ACTIVE_SESSION: Cell<*mut Session> = Cell::new(ptr::null_mut());
}

/// Point the thunks at `session`. Pass null to detach.
pub(crate) fn activate(session: *mut Session) {
    ACTIVE_SESSION.with(|slot| slot.set(session));
}

/// Borrow the active session for the duration of one callback.
///
/// # Safety
/// Must only be called from a core callback, while the pointer set by
/// [activate] is live and not aliased by another borrow.
unsafe fn active<'a>() -> Option<&'a mut Session> {
    let session = ACTIVE_SESSION.with(|slot| slot.get());
    session.as_mut()
}

unsafe extern "C" fn log_stub(_level: c_uint, _fmt: *const c_char) {}

pub(crate) unsafe extern "C" fn environment(cmd: c_uint, data: *mut c_void) -> bool {
    if ACTIVE_SESSION.with(|slot| slot.get()).is_null() {
        return false;
    }
    match cmd {
        ENVIRONMENT_GET_LOG_INTERFACE => {
            // The slot wants a printf-style variadic sink, which stable Rust
            // cannot define. This cast is UB, but there's not really a way to
            // avoid it when handing a logger to a C plugin; the stub never
            // reads its arguments.
            let cb = data as *mut RetroLogCallback;
            (*cb).log = mem::transmute::<unsafe extern "C" fn(c_uint, *const c_char), RetroLogPrintf>(
                log_stub,
            );
            true
        }
        ENVIRONMENT_GET_CAN_DUPE => {
            *(data as *mut bool) = true;
            true
        }
        ENVIRONMENT_SET_PIXEL_FORMAT => {
            let format = *(data as *const c_uint);
            matches!(
                format,
                PIXEL_FORMAT_0RGB1555 | PIXEL_FORMAT_XRGB8888 | PIXEL_FORMAT_RGB565
            )
        }
        ENVIRONMENT_GET_SYSTEM_DIRECTORY
        | ENVIRONMENT_GET_SAVE_DIRECTORY
        | ENVIRONMENT_GET_CORE_ASSETS_DIRECTORY => {
            *(data as *mut *const c_char) = ptr::null();
            false
        }
        ENVIRONMENT_SET_INPUT_DESCRIPTORS
        | ENVIRONMENT_SET_VARIABLES
        | ENVIRONMENT_SET_SUPPORT_NO_GAME
        | ENVIRONMENT_SET_MEMORY_MAPS => true,
        _ => false,
    }
}

pub(crate) unsafe extern "C" fn video_refresh(
    data: *const c_void,
    width: c_uint,
    height: c_uint,
    pitch: usize,
) {
    let session = match active() {
        Some(session) => session,
        None => return,
    };
    // Null means a duped frame; the previous conversion stays valid.
    if data.is_null() {
        return;
    }
    if let Some(sink) = session.video_sink.as_mut() {
        let bytes = slice::from_raw_parts(data as *const u8, height as usize * pitch);
        sink(&FrameBuffer {
            data: bytes,
            width,
            height,
            pitch,
        });
    }
}

pub(crate) unsafe extern "C" fn audio_sample(left: i16, right: i16) {
    if let Some(session) = active() {
        session.audio.push(left);
        session.audio.push(right);
    }
}

pub(crate) unsafe extern "C" fn audio_sample_batch(data: *const i16, frames: usize) -> usize {
    if let Some(session) = active() {
        if !data.is_null() {
            session
                .audio
                .extend_from_slice(slice::from_raw_parts(data, frames * 2));
        }
    }
    frames
}

pub(crate) unsafe extern "C" fn input_poll() {}

pub(crate) unsafe extern "C" fn input_state(
    port: c_uint,
    device: c_uint,
    index: c_uint,
    id: c_uint,
) -> i16 {
    let session = match active() {
        Some(session) => session,
        None => return 0,
    };
    if port >= 2 || device != DEVICE_JOYPAD || index != 0 {
        return 0;
    }
    let mask = session.input[port as usize];
    let pressed = |bit: u8| -> i16 { (mask & bit != 0) as i16 };
    match id {
        DEVICE_ID_JOYPAD_A => pressed(input::A),
        DEVICE_ID_JOYPAD_B => pressed(input::B),
        DEVICE_ID_JOYPAD_SELECT => pressed(input::SELECT),
        DEVICE_ID_JOYPAD_START => pressed(input::START),
        DEVICE_ID_JOYPAD_UP => pressed(input::UP),
        DEVICE_ID_JOYPAD_DOWN => pressed(input::DOWN),
        DEVICE_ID_JOYPAD_LEFT => pressed(input::LEFT),
        DEVICE_ID_JOYPAD_RIGHT => pressed(input::RIGHT),
        DEVICE_ID_JOYPAD_MASK => {
            let mut result = 0i16;
            for (bit, discrete_id) in [
                (input::B, DEVICE_ID_JOYPAD_B),
                (input::A, DEVICE_ID_JOYPAD_A),
                (input::SELECT, DEVICE_ID_JOYPAD_SELECT),
                (input::START, DEVICE_ID_JOYPAD_START),
                (input::UP, DEVICE_ID_JOYPAD_UP),
                (input::DOWN, DEVICE_ID_JOYPAD_DOWN),
                (input::LEFT, DEVICE_ID_JOYPAD_LEFT),
                (input::RIGHT, DEVICE_ID_JOYPAD_RIGHT),
            ] {
                if mask & bit != 0 {
                    result |= 1 << discrete_id;
                }
            }
            result
        }
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use std::os::raw::{c_char, c_uint, c_void};
    use std::ptr;

    use super::*;

    fn with_session<R>(mask: u8, f: impl FnOnce() -> R) -> R {
        let mut session = Session::new();
        session.input[0] = mask;
        activate(&mut session);
        let result = f();
        activate(ptr::null_mut());
        result
    }

    #[test]
    fn discrete_button_queries_follow_the_port_mask() {
        with_session(input::A | input::RIGHT, || unsafe {
            assert_eq!(input_state(0, DEVICE_JOYPAD, 0, DEVICE_ID_JOYPAD_A), 1);
            assert_eq!(input_state(0, DEVICE_JOYPAD, 0, DEVICE_ID_JOYPAD_RIGHT), 1);
            assert_eq!(input_state(0, DEVICE_JOYPAD, 0, DEVICE_ID_JOYPAD_B), 0);
            // Port 1 is held at zero.
            assert_eq!(input_state(1, DEVICE_JOYPAD, 0, DEVICE_ID_JOYPAD_A), 0);
        });
    }

    #[test]
    fn mask_query_repacks_into_discrete_bit_positions() {
        with_session(input::START | input::LEFT, || unsafe {
            let packed = input_state(0, DEVICE_JOYPAD, 0, DEVICE_ID_JOYPAD_MASK);
            assert_eq!(
                packed,
                (1i16 << DEVICE_ID_JOYPAD_START) | (1i16 << DEVICE_ID_JOYPAD_LEFT)
            );
        });
    }

    #[test]
    fn non_joypad_devices_read_zero() {
        with_session(0xFF, || unsafe {
            assert_eq!(input_state(0, DEVICE_JOYPAD + 1, 0, DEVICE_ID_JOYPAD_A), 0);
            assert_eq!(input_state(0, DEVICE_JOYPAD, 1, DEVICE_ID_JOYPAD_A), 0);
            assert_eq!(input_state(2, DEVICE_JOYPAD, 0, DEVICE_ID_JOYPAD_A), 0);
        });
    }

    #[test]
    fn environment_accepts_only_known_pixel_formats() {
        with_session(0, || unsafe {
            for format in [
                PIXEL_FORMAT_0RGB1555,
                PIXEL_FORMAT_XRGB8888,
                PIXEL_FORMAT_RGB565,
            ] {
                let mut value: c_uint = format;
                assert!(environment(
                    ENVIRONMENT_SET_PIXEL_FORMAT,
                    &mut value as *mut c_uint as *mut c_void
                ));
            }
            let mut bogus: c_uint = 99;
            assert!(!environment(
                ENVIRONMENT_SET_PIXEL_FORMAT,
                &mut bogus as *mut c_uint as *mut c_void
            ));
        });
    }

    #[test]
    fn environment_answers_can_dupe_and_nulls_directories() {
        with_session(0, || unsafe {
            let mut can_dupe = false;
            assert!(environment(
                ENVIRONMENT_GET_CAN_DUPE,
                &mut can_dupe as *mut bool as *mut c_void
            ));
            assert!(can_dupe);

            let mut dir: *const c_char = 0x1 as *const c_char;
            assert!(!environment(
                ENVIRONMENT_GET_SYSTEM_DIRECTORY,
                &mut dir as *mut *const c_char as *mut c_void
            ));
            assert!(dir.is_null());

            // Unknown commands are refused.
            assert!(!environment(12345, ptr::null_mut()));
        });
    }
}

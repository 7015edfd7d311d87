//! Reading and writing FM2 input movies.
//!
//! Only the single-gamepad subset is supported: one input byte per frame,
//! bits from MSB to LSB Right, Left, Down, Up, Start, Select, B, A. Movies
//! are assumed to begin at hard power-on; header fields beyond the ROM name
//! and checksum are fixed.

#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

use std::{
    fs,
    io::{self, BufWriter, Write},
    path::Path,
    sync::Arc,
};

pub use error::MovieError;

mod error;

const BUTTON_CHARS: [char; 8] = ['R', 'L', 'D', 'U', 'T', 'S', 'B', 'A'];

/// Render an input byte the way FM2 frame lines do, MSB first.
///
/// `0x81` renders as `R......A`.
pub fn input_to_string(input: u8) -> String {
    BUTTON_CHARS
        .iter()
        .enumerate()
        .map(|(i, &c)| if input & (0x80 >> i) != 0 { c } else { '.' })
        .collect()
}

/// Load the port-0 inputs of an FM2 movie.
///
/// # Panics
///
/// Panics if the file doesn't exist or can't be read.
#[track_caller]
pub fn load_fm2(filename: &str) -> Vec<u8> {
    match try_load_fm2(filename) {
        Ok(inputs) => inputs,
        Err(error) => panic!("Error:\n  {}\n", error),
    }
}

/// Load the port-0 inputs of an FM2 movie.
///
/// Returns an error if the file doesn't exist or can't be read. Lines that
/// are not frame records (headers, comments, subtitles) are skipped; any
/// non-`.`/space character in the port-0 field counts as pressed.
pub fn try_load_fm2(filename: &str) -> Result<Vec<u8>, MovieError> {
    let text = fs::read_to_string(filename).map_err(|error| MovieError::ReadError {
        filename: filename.to_string(),
        error: Arc::new(error),
    })?;

    let mut inputs = Vec::new();
    for line in text.lines() {
        if !line.starts_with('|') {
            continue;
        }
        // Fields: |commands|port0|port1|port2|
        let port0 = match line.split('|').nth(2) {
            Some(field) => field,
            None => continue,
        };
        let mut input = 0u8;
        for (i, c) in port0.chars().take(8).enumerate() {
            if c != '.' && c != ' ' {
                input |= 0x80 >> i;
            }
        }
        inputs.push(input);
    }
    Ok(inputs)
}

/// Write an FM2 movie with one frame record per input byte.
///
/// # Panics
///
/// Panics if the file can't be written.
#[track_caller]
pub fn save_fm2(filename: &str, rom_filename: &str, rom_checksum: &str, inputs: &[u8]) {
    if let Err(error) = try_save_fm2(filename, rom_filename, rom_checksum, inputs) {
        panic!("Error:\n  {}\n", error);
    }
}

/// Write an FM2 movie with one frame record per input byte.
///
/// `rom_filename` and `rom_checksum` are copied into the header verbatim;
/// the checksum is conventionally `base64:`-prefixed and is not verified
/// here.
///
/// Returns an error if the file can't be written.
pub fn try_save_fm2(
    filename: &str,
    rom_filename: &str,
    rom_checksum: &str,
    inputs: &[u8],
) -> Result<(), MovieError> {
    save_fm2_impl(filename, rom_filename, rom_checksum, inputs).map_err(|error| {
        MovieError::WriteError {
            filename: filename.to_string(),
            error: Arc::new(error),
        }
    })
}

fn save_fm2_impl(
    filename: &str,
    rom_filename: &str,
    rom_checksum: &str,
    inputs: &[u8],
) -> io::Result<()> {
    if let Some(dir) = Path::new(filename).parent() {
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir)?;
        }
    }
    let mut f = BufWriter::new(fs::File::create(filename)?);

    writeln!(f, "version 3")?;
    writeln!(f, "emuVersion 20604")?;
    writeln!(f, "rerecordCount 0")?;
    writeln!(f, "palFlag 0")?;
    writeln!(f, "romFilename {}", rom_filename)?;
    writeln!(f, "romChecksum {}", rom_checksum)?;
    writeln!(f, "guid 00000000-0000-0000-0000-000000000000")?;
    writeln!(f, "fourscore 0")?;
    writeln!(f, "microphone 0")?;
    writeln!(f, "port0 1")?;
    writeln!(f, "port1 0")?;
    writeln!(f, "port2 0")?;
    writeln!(f, "FDS 0")?;
    writeln!(f, "NewPPU 0")?;

    for &input in inputs {
        writeln!(f, "|0|{}|||", input_to_string(input))?;
    }
    Ok(())
}

use std::{env, process};

use clap::{App, Arg};

use playfun_emu::emu;
use playfun_objectives::{Motifs, WeightedObjectives};

use crate::search::PlayFun;

mod logging;
mod search;

fn main() {
    logging::init();

    let matches = App::new("playfun")
        .about("Greedy input search over a libretro core using learned objectives")
        .arg(
            Arg::with_name("core")
                .long("core")
                .value_name("PATH")
                .help("path to a libretro core shared object"),
        )
        .arg(
            Arg::with_name("magnitude")
                .long("magnitude")
                .help("score by objective magnitude instead of direction"),
        )
        .arg(
            Arg::with_name("game")
                .index(1)
                .help("game name; the ROM path is <game>.nes [default: smb]"),
        )
        .arg(
            Arg::with_name("movie")
                .index(2)
                .help("seed movie whose prefix starts the run [default: smb-walk.fm2]"),
        )
        .get_matches();

    let mut game = matches.value_of("game").unwrap_or("smb").to_string();
    if let Some(stripped) = game.strip_suffix(".nes") {
        game = stripped.to_string();
    }
    let movie_file = matches
        .value_of("movie")
        .unwrap_or("smb-walk.fm2")
        .to_string();
    let magnitude = matches.is_present("magnitude");
    let core_path = matches
        .value_of("core")
        .map(str::to_string)
        .or_else(|| env::var("LIBRETRO_CORE").ok());

    eprintln!("Starting playfun for {}...", game);

    let rom_path = format!("{}.nes", game);
    let initialized = match &core_path {
        Some(core) => unsafe { emu::initialize(core, &rom_path) },
        None => unsafe { emu::initialize_with_default_core(&rom_path) },
    };
    if let Err(error) = initialized {
        eprintln!("Failed to initialize emulator: {}", error);
        process::exit(1);
    }

    let objectives =
        WeightedObjectives::try_load(&format!("{}.objectives", game)).unwrap_or_else(|error| {
            eprintln!("{}", error);
            process::exit(1);
        });
    eprintln!("Loaded {} objective functions", objectives.size());

    let motifs = Motifs::try_load(&format!("{}.motifs", game)).unwrap_or_else(|error| {
        eprintln!("{}", error);
        process::exit(1);
    });
    eprintln!("Loaded {} motifs", motifs.len());

    let seed_movie = playfun_movie::try_load_fm2(&movie_file).unwrap_or_else(|error| {
        eprintln!("{}", error);
        process::exit(1);
    });

    let mut playfun = PlayFun::new(game, objectives, motifs, &seed_movie, magnitude);
    playfun.greedy();

    emu::shutdown();
}

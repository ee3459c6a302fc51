use anyhow::Result;

mod args;
mod audio;
mod misc;
mod song;

use audio::{devices::DeviceSink, sequence, tone::ToneTable};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = args::parse_args();

    if args.list_devices {
        for name in audio::devices::list_devices()? {
            println!("{name}");
        }
        return Ok(());
    }

    // Generate every tone before touching the device
    let tones = ToneTable::new();

    let mut sink = DeviceSink::open(&args.sink)?;
    log::info!("Playing {} notes", song::SONG.len());
    sequence::play_song(&mut sink, &tones, song::SONG)?;
    log::info!("Done");

    Ok(())
}

use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};

use crate::audio::devices::SinkOptions;

pub struct Args {
    pub list_devices: bool,
    pub sink: SinkOptions,
}

pub fn parse_args() -> Args {
    let m = command().get_matches();
    from_matches(&m)
}

fn command() -> Command {
    Command::new("bell-tone")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Plays 'Mary Had a Little Lamb' on the default audio output.")
        .args([
            Arg::new("output-device")
                .short('o')
                .long("output-device")
                .help("Output device to play on. The closest name match is used.")
                .default_value("default"),
            Arg::new("output-gain")
                .short('g')
                .long("output-gain")
                .help("Gain applied to the output.")
                .value_parser(value_parser!(f32))
                .default_value("1.0"),
            Arg::new("list-devices")
                .short('l')
                .long("list-devices")
                .help("Lists the available output devices and exits.")
                .action(ArgAction::SetTrue),
        ])
}

fn from_matches(m: &ArgMatches) -> Args {
    // All of these have defaults
    Args {
        list_devices: m.get_flag("list-devices"),
        sink: SinkOptions {
            device: m
                .get_one::<String>("output-device")
                .cloned()
                .unwrap_or_else(|| "default".to_owned()),
            gain: m.get_one::<f32>("output-gain").copied().unwrap_or(1.0),
        },
    }
}

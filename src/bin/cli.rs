//! Oppcom command line interface.

use std::{process, time::Duration};

use clap::{
    crate_authors, crate_description, crate_name, crate_version, value_t, App, AppSettings::*, Arg,
    ArgMatches,
};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, trace, LevelFilter};
use simplelog::*;

use oppcom::{self as opp, Selector, Session, UsbIdentity};

fn main() {
    println!("[OPP] oppcom v{}", crate_version!());

    ctrlc::set_handler(move || {
        println!("🛑 received Ctrl+C!");
        process::exit(0);
    })
    .expect("Failed to install my Ctrl-C handler!");

    let matches = App::new(crate_name!())
        .version(format!("v{}", crate_version!()).as_str())
        .author(crate_authors!())
        .about(crate_description!())
        .long_about(
            "\n\
            Oppcom looks for an OPP board among the USB serial ports of the \
            host, opens the first one it finds and reads the board's serial \
            number.\n\
            \n\
            Every exchange with the board is a single 8-byte request frame \
            followed by a single 8-byte reply frame, both protected by a \
            CRC-8 checksum. Use `-vvv` to see every frame on the line.\
        ",
        )
        .max_term_width(80)
        .setting(ColoredHelp)
        .setting(NextLineHelp)
        .arg(
            Arg::with_name("DEVICE_TTY")
                .help("the serial port to use, skipping discovery")
                .short("t")
                .long("tty")
                .takes_value(true)
                .require_equals(true),
        )
        .arg(
            Arg::with_name("DEVICE_ID")
                .help("only accept USB devices with this `vid:pid` (hex)")
                .long_help(
                    "only accept USB devices with this identity, given as \
                     `vid:pid` in hex (e.g. `0403:6001`); can be repeated to \
                     accept several identities. Without it, any USB serial \
                     device is accepted.",
                )
                .short("d")
                .long("device")
                .takes_value(true)
                .multiple(true)
                .number_of_values(1)
                .require_equals(true),
        )
        .arg(
            Arg::with_name("LIST")
                .help("list the serial ports of the host and exit")
                .short("l")
                .long("list"),
        )
        .arg(
            Arg::with_name("WAIT")
                .help("keep looking for a board for up to this many seconds")
                .short("w")
                .long("wait")
                .takes_value(true)
                .require_equals(true),
        )
        .arg(
            Arg::with_name("BAUD_RATE")
                .help("serial port baud rate")
                .short("b")
                .long("baud-rate")
                .takes_value(true)
                .default_value("115200")
                .require_equals(true),
        )
        .arg(
            Arg::with_name("TIMEOUT")
                .help("read and write timeout in milliseconds")
                .long("timeout")
                .takes_value(true)
                .default_value("10")
                .require_equals(true),
        )
        .arg(Arg::with_name("v").short("v").multiple(true).help(
            "Sets the logging level of verbosity, repeat several times for \
                higher verbosity",
        ))
        .get_matches();

    // Vary the output based on how many times the user used the "verbose" flag
    // (i.e. 'oppcom -v -v -v' or 'oppcom -vvv' vs 'oppcom -v'
    let log_level = match matches.occurrences_of("v") {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    if let Err(e) = TermLogger::init(
        log_level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    ) {
        eprintln!("failed to initialize logging: {}", e);
    }

    trace!("{:#?}", matches);

    if matches.is_present("LIST") {
        process::exit(list_ports());
    }

    match read_serial_number(&matches) {
        Ok(serial) => println!("serial number: {:#010x}", serial),
        Err(e) => {
            println!("{}: {}", style("error").red(), e);
            process::exit(1);
        }
    }
}

fn read_serial_number(matches: &ArgMatches) -> Result<u32, opp::Error> {
    // Arguments with default values always have a value; a malformed one
    // ends the process with clap's usage message.
    let baud_rate = value_t!(matches.value_of("BAUD_RATE"), u32).unwrap_or_else(|e| e.exit());
    let timeout = value_t!(matches.value_of("TIMEOUT"), u64).unwrap_or_else(|e| e.exit());

    let mut builder = opp::SettingsBuilder::default()
        .baud_rate(baud_rate)
        .timeout(Duration::from_millis(timeout));
    if let Some(path) = matches.value_of("DEVICE_TTY") {
        builder = builder.path(path);
    }
    let settings = builder.finalize();

    let mut board = match &settings.path {
        Some(path) => Session::connect(path, &settings)?,
        None => {
            let identities = matches
                .values_of("DEVICE_ID")
                .map(|values| {
                    values
                        .map(str::parse::<UsbIdentity>)
                        .collect::<Result<Vec<_>, _>>()
                })
                .transpose()?
                .unwrap_or_default();

            if matches.is_present("WAIT") {
                let seconds = value_t!(matches.value_of("WAIT"), u64).unwrap_or_else(|e| e.exit());
                wait_for_board(&settings, &identities, seconds)?
            } else {
                selector(&settings, &identities)?.acquire()?
            }
        }
    };

    let serial = board.get_serial_number()?;
    board.close();
    Ok(serial)
}

fn selector(settings: &opp::Settings, identities: &[UsbIdentity]) -> Result<Selector, opp::Error> {
    let selector = Selector::with_settings(settings.clone())?;
    Ok(identities.iter().fold(selector, |selector, id| {
        selector.with_identity_filter(id.vendor_id, id.product_id)
    }))
}

/// Look for a board once per second until one is found or `seconds` have
/// elapsed. Each attempt is a fresh discovery, so boards plugged in while
/// waiting are found.
fn wait_for_board(
    settings: &opp::Settings,
    identities: &[UsbIdentity],
    seconds: u64,
) -> Result<Session, opp::Error> {
    use retry::{delay, retry_with_index};

    let pb = ProgressBar::new_spinner();
    pb.enable_steady_tick(120);
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_strings(&["⠋", "⠙", "⠚", "⠞", "⠖", "⠦", "⠴", "⠲", "⠳", "⠓"])
            .template("[OPP] {spinner:.blue} {msg}"),
    );

    let result = retry_with_index(
        delay::Fixed::from_millis(1000).take(seconds as usize),
        |index| -> Result<Session, opp::Error> {
            debug!("Looking for a board, attempt {}", index);
            let mut selector = selector(settings, identities)?;
            pb.set_message(format!(
                "[{:03} {}] ⌛ Waiting for an OPP board to be connected...",
                style(index).dim(),
                selector.ports().len()
            ));
            selector.acquire()
        },
    );

    match result {
        Ok(board) => {
            pb.finish_with_message(format!(
                "👍 Board on {} is ready",
                style(board.port_name()).green()
            ));
            Ok(board)
        }
        Err(retry::Error::Operation {
            error,
            total_delay,
            tries,
        }) => {
            pb.finish_with_message("❌ No board found");
            info!(
                "Gave up looking for a board after {:?} and {} tries: {}",
                total_delay, tries, error,
            );
            Err(error)
        }
        Err(retry::Error::Internal(reason)) => {
            pb.finish_with_message("❌ No board found");
            info!("Internal retry error while looking for a board: {}", reason);
            Err(opp::Error::DeviceNotFound {
                scanned: 0,
                filters: identities.len(),
            })
        }
    }
}

fn list_ports() -> i32 {
    match opp::enumerate_ports() {
        Ok(ports) => {
            if ports.is_empty() {
                println!("no serial ports found");
            }
            for port in &ports {
                let line = opp::describe_port(port);
                match UsbIdentity::of(port) {
                    Some(_) => println!("{}", style(line).green()),
                    None => println!("{}", style(line).dim()),
                }
            }
            0
        }
        Err(e) => {
            println!("{}: {}", style("error").red(), e);
            1
        }
    }
}

#[macro_use]
extern crate log;
extern crate chrono;
extern crate clap;
extern crate fern;
extern crate softwire;

use std::process;
use std::time::Duration;

use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};
use softwire::address::{self, FIRST_ADDRESS, LAST_ADDRESS};
use softwire::{Error, LineInterface, Mode, SoftWire, Status, TransmissionStatus};

fn setup_logger(verbosity: u64) -> Result<(), fern::InitError> {
    let level = match verbosity {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{} [{}] {}: {}",
                chrono::Local::now().format("%H:%M:%S%.3f"),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stderr())
        .apply()?;

    Ok(())
}

fn parse_number(value: &str) -> Result<u64, Error> {
    let parsed = if value.starts_with("0x") || value.starts_with("0X") {
        u64::from_str_radix(&value[2..], 16)
    } else {
        value.parse()
    };

    parsed.map_err(|e| Error::Generic(format!("Invalid number '{}': {}", value, e)))
}

fn parse_u8(value: &str) -> Result<u8, Error> {
    let number = parse_number(value)?;
    if number > u8::max_value() as u64 {
        return Err(Error::Generic(format!("'{}' does not fit in a byte", value)));
    }
    Ok(number as u8)
}

fn parse_address(value: &str) -> Result<u8, Error> {
    let address = parse_u8(value)?;
    if !address::validate_address_7b(address) {
        return Err(Error::InvalidAddress(address));
    }
    Ok(address)
}

fn arg_number(matches: &ArgMatches, name: &str) -> Result<Option<u64>, Error> {
    match matches.value_of(name) {
        Some(value) => parse_number(value).map(Some),
        None => Ok(None),
    }
}

fn configure(matches: &ArgMatches) -> Result<SoftWire, Error> {
    let sda = parse_u8(matches.value_of("sda").unwrap_or("2"))?;
    let scl = parse_u8(matches.value_of("scl").unwrap_or("3"))?;

    let mut wire = SoftWire::new(sda, scl);
    wire.enable_pullups(matches.is_present("pullups"));

    if let Some(delay_us) = arg_number(matches, "delay-us")? {
        wire.set_delay(Duration::from_micros(delay_us));
    }
    if let Some(frequency) = arg_number(matches, "clock")? {
        wire.set_clock(frequency.min(u32::max_value() as u64) as u32);
    }
    if let Some(timeout_ms) = arg_number(matches, "timeout-ms")? {
        wire.set_timeout(Duration::from_millis(timeout_ms));
    }

    wire.begin()?;
    Ok(wire)
}

fn scan<L: LineInterface>(wire: &mut SoftWire<L>) -> Result<Vec<u8>, Error> {
    let mut found = Vec::new();

    for address in FIRST_ADDRESS..=LAST_ADDRESS {
        let status = wire.start(address, Mode::Write);
        // a timed-out start has already reset the bus
        if status != Status::TimedOut {
            let _ = wire.stop(true);
        }

        match status {
            Status::Ack => found.push(address),
            Status::Nack => trace!("Nothing at {:#04x}", address),
            Status::TimedOut => {
                return Err(Error::Generic(format!("Bus timed out addressing {:#04x}", address)));
            }
        }
    }

    info!("{} device(s) found", found.len());
    Ok(found)
}

fn read(wire: &mut SoftWire, matches: &ArgMatches) -> Result<(), Error> {
    let address = parse_address(matches.value_of("address").unwrap_or_default())?;
    let count = parse_u8(matches.value_of("count").unwrap_or("1"))? as usize;
    wire.set_rx_buffer_capacity(count);

    let keep_bus = matches.value_of("register").is_some();
    if let Some(register) = matches.value_of("register") {
        wire.begin_transmission(address);
        wire.write(parse_u8(register)?);
        let status = wire.end_transmission(false);
        if status != TransmissionStatus::Success {
            return Err(Error::Generic(format!("Setting register failed: {}", status)));
        }
    }

    let received = wire.request_from(address, count, true);
    if received < count {
        warn!("Expected {} bytes{}, got {}",
              count, if keep_bus { " after repeated start" } else { "" }, received);
    }

    let bytes: Vec<String> = (0..received)
        .filter_map(|_| wire.read())
        .map(|byte| format!("{:#04x}", byte))
        .collect();
    println!("{}", bytes.join(" "));

    if received == 0 && count > 0 {
        return Err(Error::Generic(format!("No data from {:#04x}", address)));
    }
    Ok(())
}

fn write(wire: &mut SoftWire, matches: &ArgMatches) -> Result<(), Error> {
    let address = parse_address(matches.value_of("address").unwrap_or_default())?;
    let mut bytes = Vec::new();
    for value in matches.values_of("bytes").into_iter().flat_map(|values| values) {
        bytes.push(parse_u8(value)?);
    }

    if matches.is_present("pec") {
        let mut packet = vec![address::raw_address(address, Mode::Write)];
        packet.extend_from_slice(&bytes);
        let pec = softwire::pec::crc8(&packet);
        debug!("PEC {:#04x}", pec);
        bytes.push(pec);
    }

    wire.set_tx_buffer_capacity(bytes.len());
    wire.begin_transmission(address);
    wire.write_bytes(&bytes);

    match wire.end_transmission(true) {
        TransmissionStatus::Success => {
            info!("Wrote {} byte(s) to {:#04x}", bytes.len(), address);
            Ok(())
        }
        status => Err(Error::Generic(format!("Write to {:#04x} failed: {}", address, status))),
    }
}

fn run(matches: &ArgMatches) -> Result<(), Error> {
    let mut wire = configure(matches)?;

    let result = match matches.subcommand() {
        ("scan", Some(_)) => scan(&mut wire).map(|found| {
            for address in found {
                println!("{:#04x}", address);
            }
        }),
        ("read", Some(sub)) => read(&mut wire, sub),
        ("write", Some(sub)) => write(&mut wire, sub),
        _ => Err(Error::Generic(String::from("No command given"))),
    };

    wire.end();
    result
}

fn main() {
    let matches = App::new("softwire")
        .about("Bit-banged I²C master on Raspberry Pi GPIO pins")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .arg(Arg::with_name("sda").long("sda").takes_value(true)
            .help("BCM number of the SDA pin [default: 2]"))
        .arg(Arg::with_name("scl").long("scl").takes_value(true)
            .help("BCM number of the SCL pin [default: 3]"))
        .arg(Arg::with_name("pullups").long("pullups")
            .help("Enable the internal pull-ups"))
        .arg(Arg::with_name("delay-us").long("delay-us").takes_value(true)
            .help("Half clock period in microseconds"))
        .arg(Arg::with_name("clock").long("clock").takes_value(true)
            .conflicts_with("delay-us")
            .help("Approximate clock frequency in Hz"))
        .arg(Arg::with_name("timeout-ms").long("timeout-ms").takes_value(true)
            .help("Timeout for each bus operation in milliseconds"))
        .arg(Arg::with_name("verbose").short("v").multiple(true)
            .help("More logging, repeat for more"))
        .subcommand(SubCommand::with_name("scan")
            .about("Lists the addresses that acknowledge"))
        .subcommand(SubCommand::with_name("read")
            .about("Reads bytes from a device")
            .arg(Arg::with_name("address").required(true))
            .arg(Arg::with_name("count").required(true)
                .help("Number of bytes to read, at most 255"))
            .arg(Arg::with_name("register").long("register").short("r").takes_value(true)
                .help("Register to select first, followed by a repeated start")))
        .subcommand(SubCommand::with_name("write")
            .about("Writes bytes to a device")
            .arg(Arg::with_name("address").required(true))
            .arg(Arg::with_name("bytes").multiple(true))
            .arg(Arg::with_name("pec").long("pec")
                .help("Append the SMBus packet error code")))
        .get_matches();

    if let Err(e) = setup_logger(matches.occurrences_of("verbose")) {
        eprintln!("Could not init logger: {}", e);
    }

    trace!("Setting up main");

    if let Err(error) = run(&matches) {
        eprintln!("Error: {}", error);
        process::exit(1);
    }
}

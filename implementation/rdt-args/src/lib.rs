//! Command line arguments shared by `rdt-sender` and `rdt-receiver`.
//!
//! The binaries add these to their `clap` apps and map the matches onto the
//! protocol and fault configuration. Invalid values end the process with
//! clap's usual error output.

use clap::{value_t, Arg, ArgMatches, Error, ErrorKind};
use rdt::{Config, FaultConfig};
use std::{net::SocketAddr, str::FromStr, time::Duration};

const BIND_ARG: &str = "BIND";
const CEILING_ARG: &str = "CEILING_MS";
const CORRUPT_ARG: &str = "CORRUPT";
const DUPLICATE_ARG: &str = "DUPLICATE";
const LOSS_ARG: &str = "LOSS";
const MSS_ARG: &str = "MSS";
const PEER_ARG: &str = "PEER";
const SEED_ARG: &str = "SEED";
const TIMEOUT_ARG: &str = "TIMEOUT_MS";

/// The local and the remote address, with the given defaults.
pub fn address_args<'a, 'b>(bind: &'a str, peer: &'a str) -> Vec<Arg<'a, 'b>> {
    vec![
        Arg::with_name(BIND_ARG)
            .short("b")
            .long("bind")
            .default_value(bind)
            .takes_value(true)
            .validator(parses_as::<SocketAddr>)
            .help("The local address to bind to."),
        Arg::with_name(PEER_ARG)
            .short("p")
            .long("peer")
            .default_value(peer)
            .takes_value(true)
            .validator(parses_as::<SocketAddr>)
            .help("The address of the peer."),
    ]
}

pub fn mss_arg<'a, 'b>() -> Arg<'a, 'b> {
    Arg::with_name(MSS_ARG)
        .short("m")
        .long("mss")
        .takes_value(true)
        .validator(parses_as::<usize>)
        .help("The maximum number of payload bytes per segment.")
}

/// The initial timeout and the ceiling the session is given up at.
pub fn timeout_args<'a, 'b>() -> Vec<Arg<'a, 'b>> {
    vec![
        Arg::with_name(TIMEOUT_ARG)
            .short("t")
            .long("timeout-ms")
            .takes_value(true)
            .validator(parses_as::<u64>)
            .help("The initial timeout in milliseconds."),
        Arg::with_name(CEILING_ARG)
            .short("c")
            .long("ceiling-ms")
            .takes_value(true)
            .validator(parses_as::<u64>)
            .help("Give up once the timeout grows beyond this many milliseconds."),
    ]
}

/// The fault model applied to everything this side sends.
pub fn fault_args<'a, 'b>() -> Vec<Arg<'a, 'b>> {
    vec![
        rate_arg(LOSS_ARG, "loss", "Probability of dropping a datagram."),
        rate_arg(CORRUPT_ARG, "corrupt", "Probability of flipping a bit in a datagram."),
        rate_arg(DUPLICATE_ARG, "duplicate", "Probability of sending a datagram twice."),
        Arg::with_name(SEED_ARG)
            .long("seed")
            .takes_value(true)
            .validator(parses_as::<u64>)
            .help("Seed for the fault injection, for reproducible runs."),
    ]
}

/// Gets the local and the remote address.
pub fn addresses(matches: &ArgMatches) -> (SocketAddr, SocketAddr) {
    (
        value_t!(matches, BIND_ARG, SocketAddr).unwrap_or_else(|e| e.exit()),
        value_t!(matches, PEER_ARG, SocketAddr).unwrap_or_else(|e| e.exit()),
    )
}

/// Maps the protocol arguments onto a config.
///
/// The timeout relaxes in steps of its initial value, so a single success
/// brings it back down to the floor.
pub fn config(matches: &ArgMatches) -> Config {
    let mut builder = Config::builder();

    if matches.is_present(MSS_ARG) {
        builder = builder.max_segment_size(
            value_t!(matches, MSS_ARG, usize).unwrap_or_else(|e| e.exit()),
        );
    }
    if matches.is_present(TIMEOUT_ARG) {
        let ms = value_t!(matches, TIMEOUT_ARG, u64).unwrap_or_else(|e| e.exit());
        builder = builder
            .initial_timeout(Duration::from_millis(ms))
            .relax_step(Duration::from_millis(ms));
    }
    if matches.is_present(CEILING_ARG) {
        let ms = value_t!(matches, CEILING_ARG, u64).unwrap_or_else(|e| e.exit());
        builder = builder.timeout_ceiling(Duration::from_millis(ms));
    }

    builder.build().unwrap_or_else(|e| invalid(&e.to_string()))
}

/// Maps the fault injection arguments onto a fault model.
pub fn faults(matches: &ArgMatches) -> FaultConfig {
    let faults = FaultConfig {
        corrupt_rate: value_t!(matches, CORRUPT_ARG, f64).unwrap_or_else(|e| e.exit()),
        duplicate_rate: value_t!(matches, DUPLICATE_ARG, f64).unwrap_or_else(|e| e.exit()),
        loss_rate: value_t!(matches, LOSS_ARG, f64).unwrap_or_else(|e| e.exit()),
        seed: if matches.is_present(SEED_ARG) {
            Some(value_t!(matches, SEED_ARG, u64).unwrap_or_else(|e| e.exit()))
        } else {
            None
        },
    };

    faults.validate().unwrap_or_else(|e| invalid(&e.to_string()));
    faults
}

fn rate_arg<'a, 'b>(name: &'a str, long: &'a str, help: &'a str) -> Arg<'a, 'b> {
    Arg::with_name(name)
        .long(long)
        .default_value("0")
        .takes_value(true)
        .validator(parses_as::<f64>)
        .help(help)
}

fn parses_as<T: FromStr>(val: String) -> Result<(), String> {
    val.parse::<T>()
        .map(|_| ())
        .map_err(|_| format!("'{}' is not a valid value.", val))
}

fn invalid(description: &str) -> ! {
    Error::with_description(description, ErrorKind::ValueValidation).exit()
}

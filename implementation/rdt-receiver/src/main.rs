//! Receives an RDT transfer and writes the reassembled stream to standard
//! output.

mod serve;

use clap::{
    app_from_crate, crate_authors, crate_description, crate_name, crate_version,
    AppSettings,
};
use env_logger;
use log::{error, LevelFilter};
use std::process;

fn main() {
    // Logs go to stderr, stdout only carries the payload
    env_logger::Builder::from_default_env()
        .filter(Some("rdt"), LevelFilter::Info)
        .filter(Some("rdt_receiver"), LevelFilter::Info)
        .init();

    let matches = app_from_crate!()
        .setting(AppSettings::ColoredHelp)
        .args(&rdt_args::address_args("0.0.0.0:50005", "127.0.0.1:50006"))
        .args(&rdt_args::timeout_args())
        .args(&rdt_args::fault_args())
        .get_matches();

    let (bind, peer) = rdt_args::addresses(&matches);
    let config = rdt_args::config(&matches);
    let faults = rdt_args::faults(&matches);

    // The receiver only runs until the sender has gone quiet, so this
    // always ends in an error.
    if let Err(e) = serve::serve(&bind, &peer, config, faults) {
        error!("💥  Receiver stopped: {}", e);
        process::exit(1);
    }
}

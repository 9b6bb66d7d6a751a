//! Reads all of standard input and transfers it reliably to an RDT receiver.

mod transmit;

use clap::{
    app_from_crate, crate_authors, crate_description, crate_name, crate_version,
    AppSettings,
};
use env_logger;
use log::{error, info, LevelFilter};
use std::process;

fn main() {
    env_logger::Builder::from_default_env()
        .filter(Some("rdt"), LevelFilter::Info)
        .filter(Some("rdt_sender"), LevelFilter::Info)
        .init();

    let matches = app_from_crate!()
        .setting(AppSettings::ColoredHelp)
        .args(&rdt_args::address_args("0.0.0.0:50006", "127.0.0.1:50005"))
        .arg(rdt_args::mss_arg())
        .args(&rdt_args::timeout_args())
        .args(&rdt_args::fault_args())
        .get_matches();

    let (bind, peer) = rdt_args::addresses(&matches);
    let config = rdt_args::config(&matches);
    let faults = rdt_args::faults(&matches);

    match transmit::transmit(&bind, &peer, config, faults) {
        Ok(stats) => info!("🏁  Transfer complete: {:?}", stats),
        Err(e) => {
            error!("💥  Transfer failed: {}", e);
            process::exit(1);
        }
    }
}

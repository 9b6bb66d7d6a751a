use log::info;
use rdt::{Config, FaultConfig, Lossy, UdpTransport};
use std::{
    io::{self, ErrorKind},
    net::SocketAddr,
};
use tokio::runtime::current_thread::Runtime;

/// Receives on `bind` from `peer` until the sender has gone silent.
pub fn serve(
    bind: &SocketAddr,
    peer: &SocketAddr,
    config: Config,
    faults: FaultConfig,
) -> io::Result<()> {
    if !faults.is_transparent() {
        info!("Injecting faults: {:?}", faults);
    }

    let socket = UdpTransport::bind(bind, peer)?;
    info!("⛓  Receiving on {} from {}.", socket.local_addr()?, peer);

    let transport = Lossy::new(socket, faults)
        .map_err(|e| io::Error::new(ErrorKind::InvalidInput, e))?;

    let mut rt = Runtime::new()?;
    rt.block_on(rdt::receive(transport, io::stdout(), config))
}

use log::info;
use rdt::{Config, FaultConfig, Lossy, SenderStats, UdpTransport};
use std::{
    io::{self, ErrorKind, Read},
    net::SocketAddr,
};
use tokio::runtime::current_thread::Runtime;

/// Reads standard input to the end and sends it to `peer`.
pub fn transmit(
    bind: &SocketAddr,
    peer: &SocketAddr,
    config: Config,
    faults: FaultConfig,
) -> io::Result<SenderStats> {
    let mut input = Vec::new();
    io::stdin().read_to_end(&mut input)?;

    if !faults.is_transparent() {
        info!("Injecting faults: {:?}", faults);
    }

    let socket = UdpTransport::bind(bind, peer)?;
    let local_addr = socket.local_addr()?;
    let transport = Lossy::new(socket, faults)
        .map_err(|e| io::Error::new(ErrorKind::InvalidInput, e))?;

    info!(
        "⛓  Sending {} bytes from {} to {}.",
        input.len(),
        local_addr,
        peer,
    );

    let mut rt = Runtime::new()?;
    rt.block_on(rdt::send(transport, input, config))
}

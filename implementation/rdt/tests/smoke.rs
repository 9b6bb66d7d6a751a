mod common;

use crate::common::{payload, run_timed, SharedBuf};
use futures::prelude::*;
use log::info;
use rdt::{memory, Config, FaultConfig, Lossy, Received, Transport, UdpTransport};
use std::{
    io::{Error, ErrorKind},
    sync::{Arc, Mutex},
    thread,
    time::Duration,
};
use tokio::{self, runtime::current_thread::Runtime};

fn sender_config() -> Config {
    Config::builder()
        .initial_timeout(Duration::from_millis(10))
        .relax_step(Duration::from_millis(10))
        .timeout_ceiling(Duration::from_secs(1))
        .build()
        .unwrap()
}

fn receiver_config() -> Config {
    Config::builder()
        .initial_timeout(Duration::from_millis(40))
        .relax_step(Duration::from_millis(40))
        .timeout_ceiling(Duration::from_millis(640))
        .build()
        .unwrap()
}

/// Runs a full transfer of `input` and checks that the receiver reproduced it
/// before giving up on the silent sender.
fn transfer<S, R>(sender: S, receiver: R, input: Vec<u8>)
where
    S: 'static + Send + Transport,
    R: 'static + Send + Transport,
{
    run_timed(Duration::from_secs(20), move |err_tx| {
        let output = SharedBuf::default();
        let sink = output.clone();

        let fut_send = rdt::send(sender, input.clone(), sender_config())
            .map_err(|e| format!("sender failed: {}", e));
        let fut_recv = rdt::receive(receiver, sink, receiver_config()).then(|res| {
            match res {
                Ok(()) => Err("receiver resolved successfully".to_owned()),
                Err(e) => Ok(e),
            }
        });

        let checked = fut_send
            .join(fut_recv)
            .and_then(move |(stats, err)| {
                info!("transfer finished: {:?}", stats);

                if err.kind() != ErrorKind::TimedOut {
                    return Err(format!("unexpected receiver error: {}", err));
                }
                if output.contents() != input {
                    return Err("received stream differs from input".to_owned());
                }
                Ok(())
            })
            .map_err(move |e| err_tx.send(e).unwrap());

        thread::spawn(|| tokio::run(checked));
    });
}

fn faults(seed: u64) -> FaultConfig {
    FaultConfig {
        corrupt_rate: 0.05,
        duplicate_rate: 0.05,
        loss_rate: 0.1,
        seed: Some(seed),
    }
}

#[test]
fn memory_lossless() {
    let _ = env_logger::try_init();

    let (a, b) = memory::pair();
    transfer(a, b, payload(2000));
}

#[test]
fn memory_single_byte() {
    let _ = env_logger::try_init();

    let (a, b) = memory::pair();
    transfer(a, b, payload(1));
}

#[test]
fn memory_lossy() {
    let _ = env_logger::try_init();

    let (a, b) = memory::pair();
    let a = Lossy::new(a, faults(1)).unwrap();
    let b = Lossy::new(b, faults(2)).unwrap();

    transfer(a, b, payload(5000));
}

#[test]
fn udp_localhost() {
    let _ = env_logger::try_init();

    let sender_addr = "127.0.0.1:12462".parse().unwrap();
    let receiver_addr = "127.0.0.1:12463".parse().unwrap();

    let sender = UdpTransport::bind(&sender_addr, &receiver_addr).unwrap();
    let receiver = UdpTransport::bind(&receiver_addr, &sender_addr).unwrap();

    transfer(sender, receiver, payload(3000));
}

#[test]
fn udp_lossy() {
    let _ = env_logger::try_init();

    let sender_addr = "127.0.0.1:12464".parse().unwrap();
    let receiver_addr = "127.0.0.1:12465".parse().unwrap();

    let sender = UdpTransport::bind(&sender_addr, &receiver_addr).unwrap();
    let receiver = UdpTransport::bind(&receiver_addr, &sender_addr).unwrap();

    transfer(
        Lossy::new(sender, faults(3)).unwrap(),
        Lossy::new(receiver, faults(4)).unwrap(),
        payload(3000),
    );
}

/// Records every timeout applied to the wrapped transport.
struct Recording<T> {
    inner: T,
    timeouts: Arc<Mutex<Vec<Duration>>>,
}

impl<T: Transport> Transport for Recording<T> {
    fn poll_send(&mut self, datagram: &[u8]) -> Poll<(), Error> {
        self.inner.poll_send(datagram)
    }

    fn poll_recv(&mut self) -> Poll<Received, Error> {
        self.inner.poll_recv()
    }

    fn set_timeout(&mut self, timeout: Duration) {
        self.timeouts.lock().unwrap().push(timeout);
        self.inner.set_timeout(timeout);
    }
}

#[test]
fn sender_gives_up_on_silent_peer() {
    let _ = env_logger::try_init();

    let (a, _) = memory::pair();
    let timeouts = Arc::new(Mutex::new(Vec::new()));
    let transport = Recording {
        inner: a,
        timeouts: timeouts.clone(),
    };
    let config = Config::builder()
        .initial_timeout(Duration::from_millis(10))
        .relax_step(Duration::from_millis(10))
        .timeout_ceiling(Duration::from_millis(80))
        .build()
        .unwrap();

    let mut rt = Runtime::new().unwrap();
    let err = rt
        .block_on(rdt::send(transport, payload(100), config))
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::TimedOut);
    assert_eq!(
        *timeouts.lock().unwrap(),
        [10, 20, 40, 80, 160]
            .iter()
            .map(|&ms| Duration::from_millis(ms))
            .collect::<Vec<_>>(),
    );
}

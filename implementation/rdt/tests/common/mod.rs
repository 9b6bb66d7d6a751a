#![allow(dead_code)]

use bytes::Bytes;
use rdt::{Aborted, Config, Outcome, Receiver, ReceiverStats, Received, Sender, SenderStats};
use std::{
    collections::{HashSet, VecDeque},
    fmt::Debug,
    io::{self, Write},
    sync::{mpsc, Arc, Mutex},
    time::Duration,
};

pub fn run_timed<
    E: 'static + Debug + Send,
    F: 'static + Send + FnOnce(mpsc::Sender<E>),
>(
    duration: Duration,
    func: F,
) {
    let (err_tx, err_rx) = mpsc::channel();

    func(err_tx);

    match err_rx.recv_timeout(duration) {
        Ok(err) => panic!("{:?}", err),
        Err(mpsc::RecvTimeoutError::Timeout) => panic!("timed out"),
        Err(mpsc::RecvTimeoutError::Disconnected) => {}
    }
}

/// A cloneable in-memory sink, so the output of a receiver can be inspected
/// after its future has been consumed.
#[derive(Clone, Debug, Default)]
pub struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    pub fn contents(&self) -> Vec<u8> {
        self.0.lock().unwrap().clone()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Produces a deterministic, non-repeating test payload.
pub fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 7 + i / 256) as u8).collect()
}

/// Scripted faults for one direction of the channel, by datagram index.
#[derive(Clone, Debug, Default)]
pub struct Faults {
    /// Bytes to flip a bit in, keyed by datagram index.
    corrupt: Vec<(usize, usize)>,
    drop: HashSet<usize>,
}

impl Faults {
    pub fn none() -> Self {
        Self::default()
    }

    /// Drops the n-th datagram sent in this direction.
    pub fn drop(mut self, n: usize) -> Self {
        self.drop.insert(n);
        self
    }

    /// Flips the lowest bit of byte `byte` of the n-th datagram.
    pub fn corrupt(mut self, n: usize, byte: usize) -> Self {
        self.corrupt.push((n, byte));
        self
    }

    fn apply(&self, n: usize, datagram: Bytes) -> Option<Bytes> {
        if self.drop.contains(&n) {
            return None;
        }

        let mut buf = datagram.to_vec();
        for &(_, byte) in self.corrupt.iter().filter(|(i, _)| *i == n) {
            buf[byte] ^= 0x01;
        }
        Some(buf.into())
    }
}

/// The observable result of a lockstep run.
#[derive(Debug)]
pub struct Run {
    pub acks_sent: usize,
    pub data_sent: usize,
    pub output: Vec<u8>,
    pub receiver: ReceiverStats,
    pub sender: SenderStats,
}

/// Wires a sender and a receiver together without any real I/O.
///
/// Datagrams are delivered instantly. Whenever the sender has nothing to
/// read, its timeout fires; the receiver never sees a timeout.
pub fn run_lockstep(
    input: &[u8],
    config: Config,
    initial_seq_no: u8,
    data_faults: Faults,
    ack_faults: Faults,
) -> Result<Run, Aborted> {
    let mut sender = Sender::with_initial_seq_no(input.to_vec(), &config, initial_seq_no);
    let mut receiver = Receiver::new(&config);

    let mut to_receiver = VecDeque::new();
    let mut to_sender = VecDeque::new();
    let (mut data_sent, mut acks_sent) = (0, 0);
    let mut output = Vec::new();

    let mut outcome = sender.start();
    while let Outcome::Transmit(datagram) = outcome {
        if let Some(d) = data_faults.apply(data_sent, datagram) {
            to_receiver.push_back(d);
        }
        data_sent += 1;

        while let Some(d) = to_receiver.pop_front() {
            let reaction = receiver.handle(Received::Datagram(d))?;

            if let Some(payload) = reaction.deliver {
                output.extend_from_slice(&payload);
            }
            if let Some(ack) = reaction.reply {
                if let Some(a) = ack_faults.apply(acks_sent, ack) {
                    to_sender.push_back(a);
                }
                acks_sent += 1;
            }
        }

        let event = match to_sender.pop_front() {
            Some(d) => Received::Datagram(d),
            None => Received::TimedOut,
        };
        outcome = sender.handle(event)?;
    }

    Ok(Run {
        acks_sent,
        data_sent,
        output,
        receiver: *receiver.stats(),
        sender: *sender.stats(),
    })
}

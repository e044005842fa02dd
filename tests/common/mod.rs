//! Recording fake port shared by the integration tests.

#![allow(dead_code)]

use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use stxusb::{Device, Framing, LineConfig, PortOpener};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Open(usize),
    Write(usize, Vec<u8>),
    Read(usize),
    Close(usize),
}

impl Op {
    pub fn port(&self) -> usize {
        match self {
            Op::Open(id) | Op::Write(id, _) | Op::Read(id) | Op::Close(id) => *id,
        }
    }
}

/// What the fake device does once a command has been written.
#[derive(Debug, Clone)]
pub enum Behavior {
    /// Answers every command with these bytes after a short delay.
    Reply(Vec<u8>, Duration),
    /// Never answers; every read times out.
    Silent,
}

#[derive(Clone)]
pub struct MockOpener {
    log: Arc<Mutex<Vec<Op>>>,
    next_id: Arc<AtomicUsize>,
    behavior: Behavior,
    refused: Vec<usize>,
}

impl MockOpener {
    pub fn replying(reply: &[u8]) -> Self {
        Self::new(Behavior::Reply(reply.to_vec(), Duration::ZERO))
    }

    pub fn new(behavior: Behavior) -> Self {
        Self {
            log: Arc::new(Mutex::new(Vec::new())),
            next_id: Arc::new(AtomicUsize::new(0)),
            behavior,
            refused: Vec::new(),
        }
    }

    /// Refuses the listed opens (counting from 0), as if the device had
    /// been unplugged or grabbed by another process at that moment.
    pub fn refusing(mut self, opens: &[usize]) -> Self {
        self.refused = opens.to_vec();
        self
    }

    pub fn ops(&self) -> Vec<Op> {
        self.log.lock().clone()
    }

    pub fn clear(&self) {
        self.log.lock().clear();
    }

    pub fn written(&self) -> Vec<Vec<u8>> {
        self.ops()
            .into_iter()
            .filter_map(|op| match op {
                Op::Write(_, bytes) => Some(bytes),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&Op) -> bool) -> usize {
        self.ops().iter().filter(|op| pred(op)).count()
    }
}

pub struct MockPort {
    id: usize,
    log: Arc<Mutex<Vec<Op>>>,
    behavior: Behavior,
    pending: Vec<u8>,
}

impl PortOpener for MockOpener {
    type Port = MockPort;

    fn open(&self, _endpoint: &str, _config: &LineConfig) -> io::Result<MockPort> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        if self.refused.contains(&id) {
            return Err(io::ErrorKind::PermissionDenied.into());
        }
        self.log.lock().push(Op::Open(id));
        Ok(MockPort {
            id,
            log: self.log.clone(),
            behavior: self.behavior.clone(),
            pending: Vec::new(),
        })
    }
}

impl Write for MockPort {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.log.lock().push(Op::Write(self.id, buf.to_vec()));
        if let Behavior::Reply(reply, _) = &self.behavior {
            self.pending.extend_from_slice(reply);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Read for MockPort {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.log.lock().push(Op::Read(self.id));
        match &self.behavior {
            Behavior::Silent => {
                thread::sleep(Duration::from_millis(1));
                Err(io::ErrorKind::TimedOut.into())
            }
            Behavior::Reply(_, delay) => {
                thread::sleep(*delay);
                if self.pending.is_empty() {
                    return Err(io::ErrorKind::TimedOut.into());
                }
                let n = self.pending.len().min(buf.len());
                buf[..n].copy_from_slice(&self.pending[..n]);
                self.pending.drain(..n);
                Ok(n)
            }
        }
    }
}

impl Drop for MockPort {
    fn drop(&mut self) {
        self.log.lock().push(Op::Close(self.id));
    }
}

pub fn device(opener: &MockOpener, config: LineConfig) -> Device<MockOpener> {
    let device = Device::with_opener("/dev/ttyUSB0", config, Framing::default(), opener.clone())
        .expect("mock open cannot fail");
    opener.clear();
    device
}

/// Panics unless every port's operations form one contiguous
/// open..close run.
pub fn assert_not_interleaved(ops: &[Op]) {
    let mut current = None;
    for (i, op) in ops.iter().enumerate() {
        match (op, current) {
            (Op::Open(id), None) => current = Some(*id),
            (Op::Close(id), Some(open)) if *id == open => current = None,
            (op, Some(open)) if op.port() == open && !matches!(op, Op::Open(_)) => {}
            _ => panic!("operation {} ({:?}) interleaves with {:?}", i, op, current),
        }
    }
    assert_eq!(current, None, "port left open");
}

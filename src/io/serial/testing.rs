// src/io/serial/testing.rs
//
// In-memory transports and connectors for exercising the line source and the
// monitor without hardware.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::io::ErrorKind;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::connection::{Connection, Connector, PortSettings, Transport};
use crate::io::IoError;

/// One scripted event on the wire.
#[derive(Debug, Clone)]
pub enum Step {
    /// Bytes that become available at once
    Data(Vec<u8>),
    /// The next read fails with this kind
    Fail(ErrorKind),
    /// The next read returns 0 bytes
    Eof,
}

/// Transport that replays a fixed script. Once the script runs dry it reports
/// no pending bytes forever, like an idle port.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    steps: VecDeque<Step>,
    dropped: Option<Arc<AtomicBool>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn data(mut self, bytes: &[u8]) -> Self {
        self.steps.push_back(Step::Data(bytes.to_vec()));
        self
    }

    pub fn fail(mut self, kind: ErrorKind) -> Self {
        self.steps.push_back(Step::Fail(kind));
        self
    }

    pub fn eof(mut self) -> Self {
        self.steps.push_back(Step::Eof);
        self
    }

    /// Raise `flag` when the transport is dropped.
    pub fn track_drop(mut self, flag: Arc<AtomicBool>) -> Self {
        self.dropped = Some(flag);
        self
    }
}

impl Transport for ScriptedTransport {
    fn bytes_pending(&mut self) -> std::io::Result<usize> {
        Ok(match self.steps.front() {
            Some(Step::Data(bytes)) => bytes.len(),
            Some(Step::Fail(_)) | Some(Step::Eof) => 1,
            None => 0,
        })
    }

    fn read_chunk(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self.steps.pop_front() {
            Some(Step::Data(mut bytes)) => {
                let n = bytes.len().min(buf.len());
                buf[..n].copy_from_slice(&bytes[..n]);
                if n < bytes.len() {
                    self.steps.push_front(Step::Data(bytes.split_off(n)));
                }
                Ok(n)
            }
            Some(Step::Fail(kind)) => Err(std::io::Error::new(kind, "scripted failure")),
            Some(Step::Eof) | None => Ok(0),
        }
    }
}

impl Drop for ScriptedTransport {
    fn drop(&mut self) {
        if let Some(flag) = &self.dropped {
            flag.store(true, Ordering::SeqCst);
        }
    }
}

/// Connector handing out one scripted session per `connect` call.
#[derive(Default)]
pub struct ScriptedConnector {
    sessions: RefCell<VecDeque<Result<ScriptedTransport, String>>>,
    connects: Cell<usize>,
}

impl ScriptedConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(self, transport: ScriptedTransport) -> Self {
        self.sessions.borrow_mut().push_back(Ok(transport));
        self
    }

    pub fn refuse(self, message: &str) -> Self {
        self.sessions.borrow_mut().push_back(Err(message.to_string()));
        self
    }

    pub fn connects(&self) -> usize {
        self.connects.get()
    }
}

impl Connector for ScriptedConnector {
    type Transport = ScriptedTransport;

    fn connect(&self, settings: &PortSettings) -> Result<Connection<ScriptedTransport>, IoError> {
        self.connects.set(self.connects.get() + 1);
        match self.sessions.borrow_mut().pop_front() {
            Some(Ok(transport)) => Ok(Connection::new(
                settings.port.clone(),
                settings.baud_rate,
                transport,
            )),
            Some(Err(message)) => Err(IoError::connection(&settings.port, message)),
            None => Err(IoError::connection(&settings.port, "no such device")),
        }
    }
}

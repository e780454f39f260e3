//! In-memory transport for tests.
//!
//! Records every opened connection and every frame written to it, and lets
//! tests inject inbound events through the captured [`EventSink`].

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::identifiers::ConnectionId;
use crate::protocol::InboundEvent;
use crate::session::ConnectOptions;

use super::{Connector, EventSink, TransportSocket};

/// A frame or close request written to a mock socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Written {
    Text(String),
    Binary(Vec<u8>),
    Close(u16, String),
}

/// One connection opened through [`MockConnector`].
#[derive(Clone)]
pub(crate) struct MockConnection {
    pub id: ConnectionId,
    pub options: ConnectOptions,
    sink: EventSink,
    written: Arc<Mutex<Vec<Written>>>,
}

impl MockConnection {
    /// Injects an inbound event as if the transport task emitted it.
    pub fn emit(&self, event: InboundEvent) {
        self.sink.emit(event);
    }

    /// Returns everything written so far.
    pub fn written(&self) -> Vec<Written> {
        self.written.lock().clone()
    }
}

#[derive(Default)]
pub(crate) struct MockConnector {
    opened: Mutex<Vec<MockConnection>>,
}

impl MockConnector {
    pub fn opened(&self) -> Vec<MockConnection> {
        self.opened.lock().clone()
    }

    pub fn last(&self) -> MockConnection {
        self.opened
            .lock()
            .last()
            .cloned()
            .expect("no connection opened")
    }
}

impl Connector for MockConnector {
    fn open(
        &self,
        id: ConnectionId,
        options: &ConnectOptions,
        events: EventSink,
    ) -> Result<Box<dyn TransportSocket>> {
        if options.headers.keys().any(|name| name.contains(' ')) {
            return Err(Error::invalid_argument("Invalid header name"));
        }

        let written = Arc::new(Mutex::new(Vec::new()));
        self.opened.lock().push(MockConnection {
            id,
            options: options.clone(),
            sink: events,
            written: Arc::clone(&written),
        });

        Ok(Box::new(MockSocket { written }))
    }
}

struct MockSocket {
    written: Arc<Mutex<Vec<Written>>>,
}

impl TransportSocket for MockSocket {
    fn send_text(&self, text: String) -> Result<()> {
        self.written.lock().push(Written::Text(text));
        Ok(())
    }

    fn send_binary(&self, data: Vec<u8>) -> Result<()> {
        self.written.lock().push(Written::Binary(data));
        Ok(())
    }

    fn close(&self, code: u16, reason: &str) -> Result<()> {
        self.written
            .lock()
            .push(Written::Close(code, reason.to_string()));
        Ok(())
    }
}

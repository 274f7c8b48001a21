use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use super::{HashUpdateMessage, ParentContext, SyncError};

/// Writes each message as one JSON line, optionally behind a channel prefix.
pub struct JsonLineParent<W: Write> {
    writer: W,
    prefix: &'static str,
}

impl<W: Write> JsonLineParent<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, prefix: "" }
    }

    pub fn with_prefix(mut self, prefix: &'static str) -> Self {
        self.prefix = prefix;
        self
    }
}

impl<W: Write> ParentContext for JsonLineParent<W> {
    fn post_message(&mut self, message: &HashUpdateMessage) -> Result<(), SyncError> {
        let json = serde_json::to_string(message).map_err(SyncError::EncodeMessage)?;
        writeln!(self.writer, "{}{json}", self.prefix).map_err(SyncError::Deliver)?;
        self.writer.flush().map_err(SyncError::Deliver)
    }
}

/// Keeps every message in memory; clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct RecordingParent {
    log: Rc<RefCell<Vec<HashUpdateMessage>>>,
}

impl RecordingParent {
    pub fn messages(&self) -> Vec<HashUpdateMessage> {
        self.log.borrow().clone()
    }
}

impl ParentContext for RecordingParent {
    fn post_message(&mut self, message: &HashUpdateMessage) -> Result<(), SyncError> {
        self.log.borrow_mut().push(message.clone());
        Ok(())
    }
}

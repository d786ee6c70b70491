//! Structural parse events, decoupled from formatting.
//!
//! A debugging rendering of this engine is tempting to build by subclassing
//! the reader and overriding every record-read method to print what it saw.
//! That couples the parser to a particular logging style. Instead the
//! decoder stages call into a [`ParseObserver`]; the default does nothing,
//! and [`LoggingObserver`] forwards events to the `log` facade, leaving the
//! choice of backend (env_logger, a test subscriber, nothing at all) to the
//! caller.

use log::{debug, trace};

/// A structural milestone reached while locating or walking an archive.
#[derive(Debug, Clone)]
pub enum ParseEvent<'a> {
    /// The end-of-central-directory record was found at this file offset.
    EndRecordFound { offset: u64 },
    /// A ZIP64 locator and end record were found and validated.
    Zip64Resolved { end_record_offset: u64 },
    /// A central directory file header was parsed.
    CentralHeaderParsed { index: u64, name: &'a str },
    /// A central header was correlated with its local file header and is
    /// ready to be emitted as an `EntryDescriptor`.
    LocalHeaderCorrelated { name: &'a str, payload_offset: u64 },
}

/// Receives [`ParseEvent`]s as the archive is located and walked.
pub trait ParseObserver {
    fn on_event(&self, event: ParseEvent<'_>);
}

/// The default observer: does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ParseObserver for NoopObserver {
    fn on_event(&self, _event: ParseEvent<'_>) {}
}

/// Forwards every event to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingObserver;

impl ParseObserver for LoggingObserver {
    fn on_event(&self, event: ParseEvent<'_>) {
        match event {
            ParseEvent::EndRecordFound { offset } => {
                debug!("end-of-central-directory record found at offset {offset}");
            }
            ParseEvent::Zip64Resolved { end_record_offset } => {
                debug!("zip64 end record resolved, preceding eocd at {end_record_offset}");
            }
            ParseEvent::CentralHeaderParsed { index, name } => {
                trace!("central header #{index}: {name:?}");
            }
            ParseEvent::LocalHeaderCorrelated { name, payload_offset } => {
                trace!("{name:?} correlated, payload starts at {payload_offset}");
            }
        }
    }
}

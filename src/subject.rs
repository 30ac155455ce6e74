//! Trace subjects: the things events happen to
//!
//! Two shapes share one id space:
//! - transaction payloads, described by fixed bus fields ([`PayloadAccess`])
//! - application objects carrying their own property bag ([`CustomTrace`])
//!
//! The recorder reads subjects through these traits and never keeps them;
//! it snapshots their properties when it writes a record.

use std::fmt;

use crate::format::{format_address, format_hex_msb_first};
use crate::ids::TraceKey;
use crate::properties::{PropertySet, PropertyValue};

/// Bus command carried by a payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Command {
    Read,
    Write,
    #[default]
    Ignore,
}

impl Command {
    pub fn as_str(self) -> &'static str {
        match self {
            Command::Read => "Read",
            Command::Write => "Write",
            Command::Ignore => "Ignore",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Completion status of a payload, as seen by the initiator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseStatus {
    Ok,
    #[default]
    Incomplete,
    GenericError,
    AddressError,
    CommandError,
    BurstError,
    ByteEnableError,
}

impl ResponseStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ResponseStatus::Ok => "TLM_OK_RESPONSE",
            ResponseStatus::Incomplete => "TLM_INCOMPLETE_RESPONSE",
            ResponseStatus::GenericError => "TLM_GENERIC_ERROR_RESPONSE",
            ResponseStatus::AddressError => "TLM_ADDRESS_ERROR_RESPONSE",
            ResponseStatus::CommandError => "TLM_COMMAND_ERROR_RESPONSE",
            ResponseStatus::BurstError => "TLM_BURST_ERROR_RESPONSE",
            ResponseStatus::ByteEnableError => "TLM_BYTE_ENABLE_ERROR_RESPONSE",
        }
    }
}

impl fmt::Display for ResponseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read access to a transaction payload
pub trait PayloadAccess {
    fn trace_key(&self) -> TraceKey;
    fn command(&self) -> Command;
    fn address(&self) -> u64;
    fn data_length(&self) -> usize;
    fn streaming_width(&self) -> usize;
    /// Byte-enable pattern, `None` when every byte is enabled
    fn byte_enable(&self) -> Option<&[u8]>;
    fn response_status(&self) -> ResponseStatus;
    /// Data buffer, `None` when the payload carries no data pointer
    fn data(&self) -> Option<&[u8]>;
}

/// Read access to an application-defined trace subject
pub trait CustomTrace {
    fn trace_key(&self) -> TraceKey;

    /// Display name; an empty name makes the recorder generate `T<id>`
    fn name(&self) -> &str {
        ""
    }

    fn properties(&self) -> PropertySet;
}

/// A trace subject of either shape
#[derive(Clone, Copy)]
pub enum Subject<'a> {
    Payload(&'a dyn PayloadAccess),
    Custom(&'a dyn CustomTrace),
}

impl<'a> Subject<'a> {
    pub fn payload(payload: &'a dyn PayloadAccess) -> Self {
        Subject::Payload(payload)
    }

    pub fn custom(trace: &'a dyn CustomTrace) -> Self {
        Subject::Custom(trace)
    }

    pub fn key(&self) -> TraceKey {
        match self {
            Subject::Payload(p) => p.trace_key(),
            Subject::Custom(c) => c.trace_key(),
        }
    }

    /// Name the subject reports for itself, if any
    pub fn own_name(&self) -> Option<&'a str> {
        match *self {
            Subject::Payload(_) => None,
            Subject::Custom(c) => Some(c.name()).filter(|name| !name.is_empty()),
        }
    }

    /// Fields captured once, in the subject's declaration record
    pub fn declaration_properties(&self) -> PropertySet {
        match self {
            Subject::Payload(p) => {
                let mut props = PropertySet::new();
                props.insert("Command", p.command().as_str());
                props.insert("Address", format_address(p.address()));
                props.insert("Data Length", p.data_length());
                props.insert("Streaming Width", p.streaming_width());
                if let Some(enables) = p.byte_enable() {
                    props.insert("Byte Enable Length", enables.len());
                    props.insert("Byte Enable", format_hex_msb_first(enables));
                }
                props
            }
            Subject::Custom(c) => c.properties(),
        }
    }

    /// Fields sampled at every event on the subject
    ///
    /// Custom subjects contribute nothing here; their events only carry
    /// caller-supplied extras.
    pub fn event_properties(&self) -> PropertySet {
        match self {
            Subject::Payload(p) => {
                let mut props = PropertySet::new();
                props.insert("Response Status", p.response_status().as_str());
                if let Some(data) = p.data() {
                    let len = p.data_length().min(data.len());
                    props.insert("Data", format_hex_msb_first(&data[..len]));
                }
                props
            }
            Subject::Custom(_) => PropertySet::new(),
        }
    }
}

impl fmt::Debug for Subject<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subject::Payload(p) => f.debug_tuple("Payload").field(&p.trace_key()).finish(),
            Subject::Custom(c) => f.debug_tuple("Custom").field(&c.trace_key()).finish(),
        }
    }
}

/// A plain transaction payload
#[derive(Debug, Clone)]
pub struct GenericPayload {
    key: TraceKey,
    command: Command,
    address: u64,
    data: Option<Vec<u8>>,
    streaming_width: usize,
    byte_enable: Option<Vec<u8>>,
    response_status: ResponseStatus,
}

impl Default for GenericPayload {
    fn default() -> Self {
        Self::new()
    }
}

impl GenericPayload {
    pub fn new() -> Self {
        Self {
            key: TraceKey::issue(),
            command: Command::Ignore,
            address: 0,
            data: None,
            streaming_width: 0,
            byte_enable: None,
            response_status: ResponseStatus::Incomplete,
        }
    }

    /// A read of `length` bytes at `address`, with a zeroed receive buffer
    pub fn read(address: u64, length: usize) -> Self {
        let mut payload = Self::new();
        payload.command = Command::Read;
        payload.address = address;
        payload.set_data(vec![0; length]);
        payload
    }

    /// A write of `data` at `address`
    pub fn write(address: u64, data: Vec<u8>) -> Self {
        let mut payload = Self::new();
        payload.command = Command::Write;
        payload.address = address;
        payload.set_data(data);
        payload
    }

    pub fn set_command(&mut self, command: Command) {
        self.command = command;
    }

    pub fn set_address(&mut self, address: u64) {
        self.address = address;
    }

    /// Replace the data buffer; the streaming width follows the new length
    pub fn set_data(&mut self, data: Vec<u8>) {
        self.streaming_width = data.len();
        self.data = Some(data);
    }

    pub fn clear_data(&mut self) {
        self.data = None;
    }

    pub fn data_mut(&mut self) -> Option<&mut [u8]> {
        self.data.as_deref_mut()
    }

    pub fn set_streaming_width(&mut self, width: usize) {
        self.streaming_width = width;
    }

    pub fn set_byte_enable(&mut self, pattern: Option<Vec<u8>>) {
        self.byte_enable = pattern;
    }

    pub fn set_response_status(&mut self, status: ResponseStatus) {
        self.response_status = status;
    }
}

impl PayloadAccess for GenericPayload {
    fn trace_key(&self) -> TraceKey {
        self.key
    }

    fn command(&self) -> Command {
        self.command
    }

    fn address(&self) -> u64 {
        self.address
    }

    fn data_length(&self) -> usize {
        self.data.as_ref().map_or(0, Vec::len)
    }

    fn streaming_width(&self) -> usize {
        self.streaming_width
    }

    fn byte_enable(&self) -> Option<&[u8]> {
        self.byte_enable.as_deref()
    }

    fn response_status(&self) -> ResponseStatus {
        self.response_status
    }

    fn data(&self) -> Option<&[u8]> {
        self.data.as_deref()
    }
}

impl<'a> From<&'a GenericPayload> for Subject<'a> {
    fn from(payload: &'a GenericPayload) -> Self {
        Subject::Payload(payload)
    }
}

/// A named bag of properties traced as one subject
#[derive(Debug, Clone)]
pub struct CustomSubject {
    key: TraceKey,
    name: String,
    properties: PropertySet,
}

impl CustomSubject {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            key: TraceKey::issue(),
            name: name.into(),
            properties: PropertySet::new(),
        }
    }

    /// A subject whose name the recorder generates from its id
    pub fn unnamed() -> Self {
        Self::new("")
    }

    pub fn add_property(&mut self, name: impl Into<String>, value: impl Into<PropertyValue>) {
        self.properties.insert(name, value);
    }

    pub fn set_properties(&mut self, properties: PropertySet) {
        self.properties = properties;
    }
}

impl CustomTrace for CustomSubject {
    fn trace_key(&self) -> TraceKey {
        self.key
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn properties(&self) -> PropertySet {
        self.properties.clone()
    }
}

impl<'a> From<&'a CustomSubject> for Subject<'a> {
    fn from(trace: &'a CustomSubject) -> Self {
        Subject::Custom(trace)
    }
}

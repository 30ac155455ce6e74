//! Scansion tracefile writer
//!
//! Forward-only XML output. One `<document>` root holds, in call order:
//!
//! ```text
//! <module id="M1" name="top">          nested module declarations
//!   <module id="M2" name="cpu"> ...
//! <eventtype id="E1" name="Send">      flat category declarations
//! <trace id="T1" name="T1">            flat subject declarations
//! <event type="E1" trace="T1" module="M2" time="1e-08">
//! ```
//!
//! Each record is assembled in memory and handed to the sink in one write,
//! so records never interleave. Nesting is checked: flat records may not
//! appear inside an open module container, and the document cannot be
//! closed while a container is open.

use std::fmt::Write as _;
use std::io::Write;

use crate::error::{Result, TraceError};
use crate::format::escape_attr;
use crate::ids::{CategoryId, ModuleId, TraceId};
use crate::properties::PropertySet;

const PROLOG: &str = "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n\
<!DOCTYPE document PUBLIC \"-//LOGICPOET//DTD Scansion Tracefile version 0.7//EN\"\n\
\"http://www.logicpoet.com/DTD/scansion.dtd\" >\n\
<document>\n";

const EPILOG: &str = "</document>\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocumentState {
    NotStarted,
    Open,
    Finished,
}

/// Writes one Scansion document to `W`
#[derive(Debug)]
pub struct TraceWriter<W: Write> {
    out: W,
    state: DocumentState,
    open_modules: usize,
    records: u64,
}

impl<W: Write> TraceWriter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            state: DocumentState::NotStarted,
            open_modules: 0,
            records: 0,
        }
    }

    /// Write the prolog and open the root container
    pub fn begin_document(&mut self) -> Result<()> {
        if self.state != DocumentState::NotStarted {
            return Err(TraceError::Nesting("document already started".into()));
        }
        self.out.write_all(PROLOG.as_bytes())?;
        self.state = DocumentState::Open;
        Ok(())
    }

    /// Open a module container; children go inside until [`close_module`](Self::close_module)
    pub fn open_module(&mut self, id: ModuleId, name: &str) -> Result<()> {
        self.require_open("module")?;
        let line = format!("<module id=\"{}\" name=\"{}\">\n", id, escape_attr(name));
        self.emit(&line)?;
        self.open_modules += 1;
        Ok(())
    }

    pub fn close_module(&mut self) -> Result<()> {
        self.require_open("module end")?;
        if self.open_modules == 0 {
            return Err(TraceError::Nesting("no module container is open".into()));
        }
        self.emit("</module>\n")?;
        self.open_modules -= 1;
        Ok(())
    }

    pub fn declare_category(
        &mut self,
        id: CategoryId,
        name: &str,
        properties: &PropertySet,
    ) -> Result<()> {
        self.require_flat("eventtype")?;
        let mut record = format!("<eventtype id=\"{}\" name=\"{}\">\n", id, escape_attr(name));
        push_properties(&mut record, properties);
        record.push_str("</eventtype>\n");
        self.emit(&record)
    }

    pub fn declare_trace(&mut self, id: TraceId, name: &str, properties: &PropertySet) -> Result<()> {
        self.require_flat("trace")?;
        let mut record = format!("<trace id=\"{}\" name=\"{}\">\n", id, escape_attr(name));
        push_properties(&mut record, properties);
        record.push_str("</trace>\n");
        self.emit(&record)
    }

    /// Write one event; an empty property set gives a self-closing record
    pub fn event(
        &mut self,
        category: CategoryId,
        trace: TraceId,
        module: ModuleId,
        time: &str,
        properties: &PropertySet,
    ) -> Result<()> {
        self.require_flat("event")?;
        let mut record = format!(
            "<event type=\"{}\" trace=\"{}\" module=\"{}\" time=\"{}\"",
            category,
            trace,
            module,
            escape_attr(time)
        );
        if properties.is_empty() {
            record.push_str("/>\n");
        } else {
            record.push_str(">\n");
            push_properties(&mut record, properties);
            record.push_str("</event>\n");
        }
        self.emit(&record)
    }

    /// Close the root container and flush the sink
    pub fn end_document(&mut self) -> Result<()> {
        self.require_open("document end")?;
        if self.open_modules != 0 {
            return Err(TraceError::Nesting(format!(
                "{} module container(s) still open",
                self.open_modules
            )));
        }
        self.out.write_all(EPILOG.as_bytes())?;
        self.out.flush()?;
        self.state = DocumentState::Finished;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }

    /// Records written so far, not counting the root container
    pub fn record_count(&self) -> u64 {
        self.records
    }

    pub fn is_finished(&self) -> bool {
        self.state == DocumentState::Finished
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, record: &str) -> Result<()> {
        self.out.write_all(record.as_bytes())?;
        self.records += 1;
        Ok(())
    }

    fn require_open(&self, what: &str) -> Result<()> {
        match self.state {
            DocumentState::Open => Ok(()),
            DocumentState::NotStarted => Err(TraceError::Nesting(format!(
                "{} written before the document was started",
                what
            ))),
            DocumentState::Finished => Err(TraceError::Nesting(format!(
                "{} written after the document was closed",
                what
            ))),
        }
    }

    fn require_flat(&self, what: &str) -> Result<()> {
        self.require_open(what)?;
        if self.open_modules != 0 {
            return Err(TraceError::Nesting(format!(
                "{} written inside a module container",
                what
            )));
        }
        Ok(())
    }
}

fn push_properties(record: &mut String, properties: &PropertySet) {
    for (name, value) in properties.iter() {
        // Writing to a String cannot fail.
        let _ = writeln!(
            record,
            "<property name=\"{}\" value=\"{}\"/>",
            escape_attr(name),
            escape_attr(value)
        );
    }
}

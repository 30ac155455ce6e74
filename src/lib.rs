//! Scantrace - event-trace recorder for discrete-event simulations
//!
//! This library records what happens to transactions and other trace
//! subjects as they move through the modules of a simulated system, and
//! writes it as a Scansion tracefile for a viewer to render. Entities are
//! declared the first time they are seen and referred to by compact ids
//! (`M1`, `E1`, `T1`) afterwards.

pub mod category;
pub mod cli;
pub mod config;
pub mod demo;
pub mod error;
pub mod format;
pub mod hierarchy;
pub mod ids;
pub mod properties;
pub mod registry;
pub mod session;
pub mod shared;
pub mod subject;
pub mod time;
pub mod writer;

pub use error::{Result, TraceError};

/// Types needed by most simulations that record traces
pub mod prelude {
    pub use crate::category::{CategoryRef, EventCategory};
    pub use crate::config::TracerConfig;
    pub use crate::error::{Result, TraceError};
    pub use crate::hierarchy::{HierarchySource, StaticHierarchy};
    pub use crate::ids::{ObjectId, TraceKey};
    pub use crate::properties::PropertySet;
    pub use crate::session::{MarkOptions, TraceSession};
    pub use crate::subject::{
        Command, CustomSubject, CustomTrace, GenericPayload, PayloadAccess, ResponseStatus,
        Subject,
    };
    pub use crate::time::{ManualClock, SimTime, TimeSource};
}

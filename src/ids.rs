//! Identifiers used by the recorder
//!
//! Two families live here:
//! - record ids (`M1`, `E1`, `T1`) assigned by the registry and written to the
//!   trace file, 1-based and strictly increasing per kind
//! - opaque handles (`ObjectId`, `TraceKey`, `CategoryKey`) that callers use to
//!   identify the entities they hand to the recorder

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident, $tag:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(u32);

        impl $name {
            pub(crate) fn new(value: u32) -> Self {
                Self(value)
            }

            /// Numeric part of the id
            pub fn value(self) -> u32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($tag, "{}"), self.0)
            }
        }
    };
}

record_id!(
    /// Id of a declared module, rendered `M<n>`
    ModuleId,
    "M"
);
record_id!(
    /// Id of a declared event category, rendered `E<n>`
    CategoryId,
    "E"
);
record_id!(
    /// Id of a declared trace subject, rendered `T<n>`
    ///
    /// Payload and custom subjects draw from the same counter.
    TraceId,
    "T"
);

/// Handle for a node in the simulation's object hierarchy
///
/// Issued by the [`HierarchySource`](crate::hierarchy::HierarchySource), which
/// is the only party that knows what the number refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId(u64);

impl ObjectId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

static NEXT_TRACE_KEY: AtomicU64 = AtomicU64::new(1);
static NEXT_CATEGORY_KEY: AtomicU64 = AtomicU64::new(1);

/// Identity of a trace subject, used as the interning key
///
/// Every call to [`TraceKey::issue`] returns a key never returned before in
/// this process. An owner that recycles a subject for a logically new
/// transaction either retires the key or issues a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TraceKey(u64);

impl TraceKey {
    pub fn issue() -> Self {
        Self(NEXT_TRACE_KEY.fetch_add(1, Ordering::Relaxed))
    }
}

/// Identity of an explicitly constructed [`EventCategory`](crate::category::EventCategory)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CategoryKey(u64);

impl CategoryKey {
    pub fn issue() -> Self {
        Self(NEXT_CATEGORY_KEY.fetch_add(1, Ordering::Relaxed))
    }
}

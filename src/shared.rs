//! Process-wide trace session
//!
//! Simulations are single-threaded, so the shared session lives in a
//! thread-local slot on the simulation thread. Install it once during setup,
//! record through [`with`] or [`mark_event!`](crate::mark_event) from
//! anywhere in the model, and call [`shutdown`] before the process exits.
//!
//! ```no_run
//! use scantrace::prelude::*;
//! use scantrace::shared;
//! use std::rc::Rc;
//!
//! let mut tree = StaticHierarchy::new();
//! let top = tree.add_module(None, "top");
//! let clock = Rc::new(ManualClock::new());
//!
//! shared::install(TraceSession::new(
//!     Box::new(tree) as Box<dyn HierarchySource>,
//!     Box::new(Rc::clone(&clock)) as Box<dyn TimeSource>,
//! ));
//! shared::set_shared_filename("run");
//!
//! let packet = CustomSubject::new("pkt-0");
//! scantrace::mark_event!(top, &packet, "Send")?;
//! shared::shutdown()?;
//! # Ok::<(), scantrace::TraceError>(())
//! ```

use std::cell::RefCell;

use crate::error::{Result, TraceError};
use crate::hierarchy::HierarchySource;
use crate::session::TraceSession;
use crate::time::TimeSource;

/// Session type held in the shared slot
pub type SharedSession = TraceSession<Box<dyn HierarchySource>, Box<dyn TimeSource>>;

thread_local! {
    static SHARED: RefCell<Option<SharedSession>> = const { RefCell::new(None) };
}

/// Install `session` as the shared session, returning the one it replaces
pub fn install(session: SharedSession) -> Option<SharedSession> {
    SHARED.with(|slot| slot.borrow_mut().replace(session))
}

pub fn is_installed() -> bool {
    SHARED.with(|slot| slot.borrow().is_some())
}

/// Run `f` against the shared session
///
/// # Errors
/// [`TraceError::NotInstalled`] when no session is installed.
///
/// # Panics
/// If `f` re-enters `with` on the same thread.
pub fn with<R>(f: impl FnOnce(&mut SharedSession) -> R) -> Result<R> {
    SHARED.with(|slot| {
        let mut slot = slot.borrow_mut();
        let session = slot.as_mut().ok_or(TraceError::NotInstalled)?;
        Ok(f(session))
    })
}

/// Change the shared session's file name; `false` once recording started
pub fn set_shared_filename(filename: &str) -> bool {
    with(|session| session.set_filename(filename)).unwrap_or(false)
}

pub fn shared_filename() -> Option<String> {
    with(|session| session.filename().to_string()).ok()
}

/// Close and remove the shared session
///
/// Does nothing when no session is installed.
pub fn shutdown() -> Result<()> {
    let session = SHARED.with(|slot| slot.borrow_mut().take());
    match session {
        Some(mut session) => session.close(),
        None => Ok(()),
    }
}

/// Record an event through the shared session
///
/// Expands to a [`TraceSession::mark`] or
/// [`mark_with`](TraceSession::mark_with) call and evaluates to
/// `scantrace::Result<()>`.
#[macro_export]
macro_rules! mark_event {
    ($module:expr, $subject:expr, $category:expr $(,)?) => {
        $crate::shared::with(|session| session.mark($module, $subject, $category))
            .and_then(|result| result)
    };
    ($module:expr, $subject:expr, $category:expr, $options:expr $(,)?) => {
        $crate::shared::with(|session| session.mark_with($module, $subject, $category, $options))
            .and_then(|result| result)
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::StaticHierarchy;
    use crate::session::MarkOptions;
    use crate::subject::CustomSubject;
    use crate::time::{ManualClock, SimTime};
    use std::fs;
    use tempfile::TempDir;

    fn install_fresh(dir: &TempDir) -> crate::ids::ObjectId {
        let mut tree = StaticHierarchy::new();
        let top = tree.add_module(None, "top");
        let session = TraceSession::new(
            Box::new(tree) as Box<dyn HierarchySource>,
            Box::new(ManualClock::new()) as Box<dyn TimeSource>,
        );
        install(session);
        assert!(set_shared_filename(dir.path().join("shared").to_str().unwrap()));
        top
    }

    #[test]
    fn test_not_installed() {
        // Each test runs on its own thread, so the slot starts empty.
        assert!(!is_installed());
        assert!(matches!(with(|_| ()), Err(TraceError::NotInstalled)));
        assert_eq!(shared_filename(), None);
        assert!(!set_shared_filename("x"));
        shutdown().unwrap();
    }

    #[cfg(not(feature = "events-off"))]
    #[test]
    fn test_mark_event_through_shared_session() {
        let dir = TempDir::new().unwrap();
        let top = install_fresh(&dir);
        let packet = CustomSubject::new("pkt-0");

        crate::mark_event!(top, &packet, "Send").unwrap();
        crate::mark_event!(
            top,
            &packet,
            "Receive",
            MarkOptions::new().at(SimTime::from_ns(3))
        )
        .unwrap();

        assert!(!set_shared_filename("too_late"));
        assert!(shared_filename().unwrap().ends_with("shared.scnx"));
        shutdown().unwrap();
        assert!(!is_installed());

        let text = fs::read_to_string(dir.path().join("shared.scnx")).unwrap();
        assert_eq!(text.matches("<event ").count(), 2);
        assert!(text.ends_with("</document>\n"));
    }

    #[test]
    fn test_install_replaces_previous() {
        let dir = TempDir::new().unwrap();
        install_fresh(&dir);
        let previous = install(TraceSession::new(
            Box::new(StaticHierarchy::new()) as Box<dyn HierarchySource>,
            Box::new(ManualClock::new()) as Box<dyn TimeSource>,
        ));
        assert!(previous.is_some());
        shutdown().unwrap();
    }
}

//! Trace session: lifecycle control and event recording
//!
//! A session moves through three states:
//!
//! ```text
//! Uninitialized --first registration or mark--> Open --close / drop--> Closed
//! ```
//!
//! Nothing touches the filesystem at construction. The file is created,
//! and the module hierarchy walked, by the first call that needs it; by then
//! the caller has finished building its model. While uninitialized the
//! destination name may still change; once open it is frozen.
//!
//! # Example
//!
//! ```no_run
//! use scantrace::prelude::*;
//!
//! let mut tree = StaticHierarchy::new();
//! let top = tree.add_module(None, "top");
//! let clock = ManualClock::new();
//!
//! let mut session = TraceSession::new(&tree, &clock);
//! session.set_filename("bus_run");
//!
//! let payload = GenericPayload::write(0x40, vec![0x12, 0x34]);
//! session.mark(top, &payload, "Request")?;
//! session.close()?;
//! # Ok::<(), scantrace::TraceError>(())
//! ```

use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use tracing::{debug, error, warn};

use crate::category::{CategoryRef, EventCategory};
use crate::config::{normalize_filename, TracerConfig};
use crate::error::{Result, TraceError};
use crate::hierarchy::{register_all_modules, HierarchySource};
use crate::ids::{CategoryId, CategoryKey, ModuleId, ObjectId, TraceId};
use crate::properties::{PropertySet, PropertyValue};
use crate::registry::Registry;
use crate::subject::Subject;
use crate::time::{SimTime, TimeSource};
use crate::writer::TraceWriter;

/// `false` when the crate is built with the `events-off` feature
#[cfg(not(feature = "events-off"))]
pub const EVENTS_COMPILED: bool = true;
#[cfg(feature = "events-off")]
pub const EVENTS_COMPILED: bool = false;

type FileWriter = TraceWriter<BufWriter<File>>;

enum SessionState {
    Uninitialized,
    Open(FileWriter),
    Closed,
}

/// Optional arguments of a mark
///
/// ```
/// use scantrace::session::MarkOptions;
/// use scantrace::time::SimTime;
///
/// let options = MarkOptions::new()
///     .at(SimTime::from_ns(20))
///     .property("Port", 3);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MarkOptions {
    time: Option<SimTime>,
    properties: PropertySet,
}

impl MarkOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the event at `time` instead of the clock's current time
    pub fn at(mut self, time: SimTime) -> Self {
        self.time = Some(time);
        self
    }

    /// Add one extra event property
    pub fn property(mut self, name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(name, value);
        self
    }

    /// Add a set of extra event properties
    pub fn properties(mut self, properties: &PropertySet) -> Self {
        self.properties.merge(properties);
        self
    }
}

/// Counters describing a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    pub filename: String,
    pub state: &'static str,
    pub modules: u32,
    pub categories: u32,
    pub traces: u32,
    pub events: u64,
}

/// Records one Scansion trace file for a simulation run
pub struct TraceSession<H, T> {
    hierarchy: H,
    clock: T,
    filename: String,
    events_enabled: bool,
    state: SessionState,
    registry: Registry,
    events: u64,
}

impl<H: HierarchySource, T: TimeSource> TraceSession<H, T> {
    /// A session with the default configuration
    pub fn new(hierarchy: H, clock: T) -> Self {
        Self::with_config(hierarchy, clock, TracerConfig::default())
    }

    pub fn with_config(hierarchy: H, clock: T, config: TracerConfig) -> Self {
        Self {
            hierarchy,
            clock,
            filename: normalize_filename(&config.filename),
            events_enabled: config.events_enabled,
            state: SessionState::Uninitialized,
            registry: Registry::new(),
            events: 0,
        }
    }

    /// Change the destination file
    ///
    /// The `.scnx` suffix is appended when missing. Once the session is open
    /// the name is frozen: the request is ignored with a warning and `false`
    /// is returned.
    pub fn set_filename(&mut self, filename: &str) -> bool {
        if !matches!(self.state, SessionState::Uninitialized) {
            warn!(
                "Attempted to assign filename {} after trace recording has started; \
                 ignoring it, file recorded to: {}",
                filename, self.filename
            );
            return false;
        }
        self.filename = normalize_filename(filename);
        true
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, SessionState::Open(_))
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.state, SessionState::Closed)
    }

    pub fn events_enabled(&self) -> bool {
        EVENTS_COMPILED && self.events_enabled
    }

    /// Runtime switch for event records; registrations are unaffected
    pub fn set_events_enabled(&mut self, enabled: bool) {
        self.events_enabled = enabled;
    }

    /// Open the file and declare the module hierarchy, if not done yet
    ///
    /// Every registration and mark calls this first, so calling it directly
    /// is only needed to force the file into existence early.
    ///
    /// # Errors
    /// [`TraceError::Open`] if the file cannot be created,
    /// [`TraceError::Closed`] once the session is closed. A failed open
    /// closes the session for good.
    pub fn open(&mut self) -> Result<()> {
        match self.state {
            SessionState::Open(_) => Ok(()),
            SessionState::Closed => Err(TraceError::Closed),
            SessionState::Uninitialized => match self.start_document() {
                Ok(writer) => {
                    self.state = SessionState::Open(writer);
                    Ok(())
                }
                Err(e) => {
                    // A failed open is final.
                    self.state = SessionState::Closed;
                    Err(e)
                }
            },
        }
    }

    fn start_document(&mut self) -> Result<FileWriter> {
        let path = PathBuf::from(&self.filename);
        let file = File::create(&path).map_err(|source| {
            error!("Cannot open trace file {}: {}", path.display(), source);
            TraceError::Open {
                path: path.clone(),
                source,
            }
        })?;
        let mut writer = TraceWriter::new(BufWriter::new(file));
        let started = writer.begin_document().and_then(|()| {
            register_all_modules(&self.hierarchy, &mut self.registry, &mut writer)
        });
        match started {
            Ok(modules) => {
                debug!(
                    "Trace file {} opened, {} module(s) declared",
                    path.display(),
                    modules
                );
                Ok(writer)
            }
            Err(e) => {
                error!("Failed to start trace file {}: {}", path.display(), e);
                Err(e)
            }
        }
    }

    /// Declare a trace subject now rather than at its first mark
    ///
    /// Returns the subject's id. A subject that is already registered keeps
    /// its id and is not declared again.
    pub fn initialize_trace<'a>(&mut self, subject: impl Into<Subject<'a>>) -> Result<TraceId> {
        self.open()?;
        self.intern_subject(subject.into(), None)
    }

    /// Like [`initialize_trace`](Self::initialize_trace), under a chosen display name
    pub fn initialize_named_trace<'a>(
        &mut self,
        name: &str,
        subject: impl Into<Subject<'a>>,
    ) -> Result<TraceId> {
        self.open()?;
        let subject = subject.into();
        if let Some(id) = self.registry.trace_id(subject.key()) {
            warn!(
                "Trace {} is already registered; ignoring display name {}",
                id, name
            );
            return Ok(id);
        }
        self.intern_subject(subject, Some(name))
    }

    /// Forget a subject's id before its owner reuses it for a new transaction
    ///
    /// Records already written are untouched; the next registration or mark
    /// of the subject declares it again under a new id. Returns the id that
    /// was released, if any.
    pub fn retire_trace<'a>(&mut self, subject: impl Into<Subject<'a>>) -> Option<TraceId> {
        let subject = subject.into();
        let retired = self.registry.retire_trace(subject.key());
        if let Some(id) = retired {
            debug!("Retired trace {}", id);
        }
        retired
    }

    /// Declare an event category with its static properties
    ///
    /// The category's name is bound too, so later marks that name it
    /// reuse this declaration.
    pub fn register_category(&mut self, category: &EventCategory) -> Result<CategoryId> {
        self.open()?;
        self.intern_category(CategoryRef::Object(category))
    }

    /// Record an event at the current simulated time
    pub fn mark<'a, 'c>(
        &mut self,
        module: ObjectId,
        subject: impl Into<Subject<'a>>,
        category: impl Into<CategoryRef<'c>>,
    ) -> Result<()> {
        self.mark_with(module, subject, category, MarkOptions::default())
    }

    /// Record an event at an explicit time
    pub fn mark_at<'a, 'c>(
        &mut self,
        module: ObjectId,
        subject: impl Into<Subject<'a>>,
        time: SimTime,
        category: impl Into<CategoryRef<'c>>,
    ) -> Result<()> {
        self.mark_with(module, subject, category, MarkOptions::new().at(time))
    }

    /// Record an event on `subject`, seen by `module`
    ///
    /// Subjects and categories not seen before are declared on the spot.
    /// Extra properties override the subject's own event fields on name
    /// collision. With events disabled this does nothing at all, not even
    /// open the session.
    ///
    /// # Errors
    /// [`TraceError::UnregisteredModule`] if `module` was not found in the
    /// hierarchy walk, plus any error of [`open`](Self::open) or the writer.
    pub fn mark_with<'a, 'c>(
        &mut self,
        module: ObjectId,
        subject: impl Into<Subject<'a>>,
        category: impl Into<CategoryRef<'c>>,
        options: MarkOptions,
    ) -> Result<()> {
        if !self.events_enabled() {
            return Ok(());
        }
        let subject = subject.into();
        self.open()?;

        let module_id = self.intern_module(module)?;
        let trace_id = self.intern_subject(subject, None)?;
        let category_id = self.intern_category(category.into())?;

        let time = options.time.unwrap_or_else(|| self.clock.now());
        let mut properties = subject.event_properties();
        properties.merge(&options.properties);

        self.writer()?.event(
            category_id,
            trace_id,
            module_id,
            &time.to_trace_string(),
            &properties,
        )?;
        self.events += 1;
        Ok(())
    }

    /// Close the root container and flush the file
    ///
    /// Safe to call more than once; only the first call on an open session
    /// writes anything. A session that never opened produces no file.
    pub fn close(&mut self) -> Result<()> {
        match std::mem::replace(&mut self.state, SessionState::Closed) {
            SessionState::Open(mut writer) => {
                writer.end_document()?;
                debug!(
                    "Trace file {} closed after {} record(s)",
                    self.filename,
                    writer.record_count()
                );
                Ok(())
            }
            SessionState::Uninitialized | SessionState::Closed => Ok(()),
        }
    }

    /// Push buffered records to the file without closing it
    pub fn flush(&mut self) -> Result<()> {
        if let SessionState::Open(writer) = &mut self.state {
            writer.flush()?;
        }
        Ok(())
    }

    pub fn stats(&self) -> SessionStats {
        let state = match self.state {
            SessionState::Uninitialized => "uninitialized",
            SessionState::Open(_) => "open",
            SessionState::Closed => "closed",
        };
        SessionStats {
            filename: self.filename.clone(),
            state,
            modules: self.registry.module_count(),
            categories: self.registry.category_count(),
            traces: self.registry.trace_count(),
            events: self.events,
        }
    }

    /// Id of a module declared by the hierarchy walk
    pub fn module_id(&self, module: ObjectId) -> Option<ModuleId> {
        self.registry.module_id(module)
    }

    pub fn hierarchy(&self) -> &H {
        &self.hierarchy
    }

    pub fn clock(&self) -> &T {
        &self.clock
    }

    fn writer(&mut self) -> Result<&mut FileWriter> {
        match &mut self.state {
            SessionState::Open(writer) => Ok(writer),
            SessionState::Uninitialized | SessionState::Closed => Err(TraceError::Closed),
        }
    }

    fn intern_module(&self, module: ObjectId) -> Result<ModuleId> {
        self.registry.module_id(module).ok_or_else(|| {
            error!("Module {} is not registered", module);
            TraceError::UnregisteredModule { object: module }
        })
    }

    fn intern_category(&mut self, category: CategoryRef<'_>) -> Result<CategoryId> {
        match category {
            CategoryRef::Object(category) => match self.registry.category_id(category.key()) {
                Some(id) => Ok(id),
                None => self.declare_category(
                    Some(category.key()),
                    category.name(),
                    category.properties(),
                ),
            },
            CategoryRef::Name(name) => match self.registry.category_id_by_name(name) {
                Some(id) => Ok(id),
                None => self.declare_category(None, name, &PropertySet::new()),
            },
        }
    }

    fn declare_category(
        &mut self,
        key: Option<CategoryKey>,
        name: &str,
        properties: &PropertySet,
    ) -> Result<CategoryId> {
        let id = self.registry.declare_category(key, name);
        self.writer()?.declare_category(id, name, properties)?;
        debug!("Declared event category {} ({})", id, name);
        Ok(id)
    }

    fn intern_subject(&mut self, subject: Subject<'_>, name: Option<&str>) -> Result<TraceId> {
        if let Some(id) = self.registry.trace_id(subject.key()) {
            return Ok(id);
        }
        let id = self.registry.declare_trace(subject.key());
        let name = name
            .or_else(|| subject.own_name())
            .map(str::to_string)
            .unwrap_or_else(|| id.to_string());
        self.writer()?
            .declare_trace(id, &name, &subject.declaration_properties())?;
        debug!("Declared trace {} ({:?})", id, subject);
        Ok(id)
    }
}

impl<H, T> Drop for TraceSession<H, T> {
    fn drop(&mut self) {
        if let SessionState::Open(mut writer) =
            std::mem::replace(&mut self.state, SessionState::Closed)
        {
            if let Err(e) = writer.end_document() {
                error!("Failed to finish trace file {}: {}", self.filename, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::StaticHierarchy;
    use crate::subject::{CustomSubject, GenericPayload, ResponseStatus};
    use crate::time::ManualClock;
    use std::fs;
    use tempfile::TempDir;

    struct Fixture {
        dir: TempDir,
        tree: StaticHierarchy,
        top: ObjectId,
        child: ObjectId,
        clock: ManualClock,
    }

    fn fixture() -> Fixture {
        let mut tree = StaticHierarchy::new();
        let top = tree.add_module(None, "top");
        let child = tree.add_module(Some(top), "child");
        Fixture {
            dir: TempDir::new().unwrap(),
            tree,
            top,
            child,
            clock: ManualClock::new(),
        }
    }

    impl Fixture {
        fn session(&self) -> TraceSession<&StaticHierarchy, &ManualClock> {
            let mut session = TraceSession::new(&self.tree, &self.clock);
            session.set_filename(self.dir.path().join("run").to_str().unwrap());
            session
        }

        fn output(&self) -> String {
            fs::read_to_string(self.dir.path().join("run.scnx")).unwrap()
        }
    }

    #[test]
    fn test_construction_touches_nothing() {
        let fx = fixture();
        let session = fx.session();
        assert!(!session.is_open());
        drop(session);
        assert!(!fx.dir.path().join("run.scnx").exists());
    }

    #[cfg(not(feature = "events-off"))]
    #[test]
    fn test_mark_opens_and_declares_everything() {
        let fx = fixture();
        let mut session = fx.session();
        let trace = CustomSubject::new("pkt");
        fx.clock.set(SimTime::from_ns(10));
        session.mark(fx.child, &trace, "Send").unwrap();
        session.close().unwrap();

        let text = fx.output();
        assert!(text.contains("<module id=\"M1\" name=\"top\">\n<module id=\"M2\" name=\"child\">\n</module>\n</module>\n"));
        assert!(text.contains("<eventtype id=\"E1\" name=\"Send\">\n</eventtype>\n"));
        assert!(text.contains("<trace id=\"T1\" name=\"pkt\">\n</trace>\n"));
        assert!(text.contains("<event type=\"E1\" trace=\"T1\" module=\"M2\" time=\"1e-08\"/>\n"));
        assert!(text.ends_with("</document>\n"));
    }

    #[cfg(not(feature = "events-off"))]
    #[test]
    fn test_unregistered_module_is_fatal() {
        let fx = fixture();
        let mut session = fx.session();
        let trace = CustomSubject::new("pkt");
        let err = session
            .mark(ObjectId::new(999), &trace, "Send")
            .unwrap_err();
        assert!(matches!(err, TraceError::UnregisteredModule { .. }));
    }

    #[test]
    fn test_rename_after_open_is_ignored() {
        let fx = fixture();
        let mut session = fx.session();
        assert!(session.set_filename(fx.dir.path().join("run").to_str().unwrap()));
        session.open().unwrap();
        assert!(!session.set_filename("other"));
        assert!(session.filename().ends_with("run.scnx"));
    }

    #[cfg(not(feature = "events-off"))]
    #[test]
    fn test_payload_event_properties_and_overrides() {
        let fx = fixture();
        let mut session = fx.session();
        let mut payload = GenericPayload::write(0x10, vec![0x12, 0x34]);
        payload.set_response_status(ResponseStatus::Ok);

        session
            .mark_with(
                fx.top,
                &payload,
                "Request",
                MarkOptions::new()
                    .at(SimTime::from_ns(5))
                    .property("Response Status", "overridden")
                    .property("Lane", 2),
            )
            .unwrap();
        session.close().unwrap();

        let text = fx.output();
        assert!(text.contains("<property name=\"Data\" value=\"0x3412\"/>"));
        assert!(text.contains("<property name=\"Lane\" value=\"2\"/>"));
        assert!(text.contains("<property name=\"Response Status\" value=\"overridden\"/>"));
        assert!(!text.contains("TLM_OK_RESPONSE"));
        assert!(text.contains("time=\"5e-09\""));
    }

    #[test]
    fn test_events_disabled_skips_mark_but_not_registration() {
        let fx = fixture();
        let mut session = fx.session();
        session.set_events_enabled(false);
        let trace = CustomSubject::new("pkt");

        session.mark(fx.top, &trace, "Send").unwrap();
        assert!(!session.is_open());

        let id = session.initialize_trace(&trace).unwrap();
        assert!(session.is_open());
        session.mark(fx.top, &trace, "Send").unwrap();
        session.close().unwrap();

        let text = fx.output();
        assert_eq!(id.value(), 1);
        assert!(text.contains("<module id=\"M1\" name=\"top\">"));
        assert!(text.contains("<trace id=\"T1\" name=\"pkt\">"));
        assert!(!text.contains("<event"));
        assert!(!text.contains("<eventtype"));
    }

    #[test]
    fn test_close_is_idempotent_and_final() {
        let fx = fixture();
        let mut session = fx.session();
        session.open().unwrap();
        session.close().unwrap();
        session.close().unwrap();
        assert!(session.is_closed());

        let trace = CustomSubject::new("late");
        assert!(matches!(
            session.initialize_trace(&trace),
            Err(TraceError::Closed)
        ));
        assert_eq!(fx.output().matches("</document>").count(), 1);
    }

    #[test]
    fn test_drop_finishes_document() {
        let fx = fixture();
        {
            let mut session = fx.session();
            session.open().unwrap();
        }
        assert!(fx.output().ends_with("</module>\n</document>\n"));
    }

    #[cfg(not(feature = "events-off"))]
    #[test]
    fn test_stats() {
        let fx = fixture();
        let mut session = fx.session();
        let a = CustomSubject::new("a");
        let b = GenericPayload::read(0, 4);
        session.mark(fx.top, &a, "Send").unwrap();
        session.mark(fx.child, &b, "Send").unwrap();
        session.mark(fx.child, &b, "Receive").unwrap();

        let stats = session.stats();
        assert_eq!(stats.state, "open");
        assert_eq!(stats.modules, 2);
        assert_eq!(stats.categories, 2);
        assert_eq!(stats.traces, 2);
        assert_eq!(stats.events, 3);
    }

    #[test]
    fn test_open_failure_is_reported() {
        let fx = fixture();
        let mut session = TraceSession::new(&fx.tree, &fx.clock);
        session.set_filename(fx.dir.path().join("missing/dir/run").to_str().unwrap());
        let err = session.open().unwrap_err();
        assert!(matches!(err, TraceError::Open { .. }));
        assert!(!session.is_open());
        assert!(session.is_closed());
        assert!(matches!(session.open(), Err(TraceError::Closed)));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_failed_walk_is_final() {
        if !std::path::Path::new("/dev/full").exists() {
            return;
        }
        let dir = TempDir::new().unwrap();
        let link = dir.path().join("full.scnx");
        std::os::unix::fs::symlink("/dev/full", &link).unwrap();

        // Enough module records to overflow the write buffer mid-walk
        let mut tree = StaticHierarchy::new();
        let top = tree.add_module(None, "top");
        for i in 0..2_000 {
            tree.add_module(Some(top), format!("unit_with_a_long_name_{}", i));
        }
        let clock = ManualClock::new();
        let mut session = TraceSession::new(&tree, &clock);
        session.set_filename(link.to_str().unwrap());

        assert!(matches!(session.open(), Err(TraceError::Write(_))));
        assert!(session.is_closed());
        let trace = CustomSubject::new("pkt");
        assert!(matches!(
            session.initialize_trace(&trace),
            Err(TraceError::Closed)
        ));
    }

    #[test]
    fn test_named_trace_keeps_first_registration() {
        let fx = fixture();
        let mut session = fx.session();
        let payload = GenericPayload::read(0x80, 4);

        let first = session.initialize_named_trace("bus", &payload).unwrap();
        let again = session.initialize_named_trace("renamed", &payload).unwrap();
        assert_eq!(first, again);
        session.close().unwrap();

        let text = fx.output();
        assert_eq!(text.matches("<trace ").count(), 1);
        assert!(text.contains("<trace id=\"T1\" name=\"bus\">"));
        assert!(!text.contains("renamed"));
    }

    #[cfg(feature = "events-off")]
    #[test]
    fn test_compiled_out_marks_leave_registration_working() {
        assert!(!EVENTS_COMPILED);
        let fx = fixture();
        let mut session = fx.session();
        assert!(!session.events_enabled());
        session.set_events_enabled(true);
        assert!(!session.events_enabled());

        let trace = CustomSubject::new("pkt");
        session.mark(fx.child, &trace, "Send").unwrap();
        assert!(!session.is_open());

        session.initialize_trace(&trace).unwrap();
        assert!(session.is_open());
        session.register_category(&EventCategory::new("Route")).unwrap();
        session.mark(fx.child, &trace, "Route").unwrap();
        session.close().unwrap();

        let text = fx.output();
        assert!(text.contains("<module id=\"M2\" name=\"child\">"));
        assert!(text.contains("<trace id=\"T1\" name=\"pkt\">"));
        assert!(text.contains("<eventtype id=\"E1\" name=\"Route\">"));
        assert!(!text.contains("<event "));
        assert_eq!(session.stats().events, 0);
    }
}

//! Raw filesystem events, reduced to the operations the engine acts on.

use std::path::PathBuf;

use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind};

/// Operation kind of a raw event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawKind {
    /// A path appeared (created or moved into a watched directory).
    Create,
    /// File content was written.
    Write,
    /// A path was removed.
    Remove,
    /// Anything else: metadata, access, rename source. Never acted upon.
    Other,
}

/// A `(path, operation)` pair delivered by the event source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    pub path: PathBuf,
    pub kind: RawKind,
}

impl RawEvent {
    pub fn new(path: impl Into<PathBuf>, kind: RawKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    /// Split a notify event into one raw event per affected path.
    pub fn from_notify(event: &Event) -> Vec<RawEvent> {
        let kind = RawKind::from(&event.kind);
        event
            .paths
            .iter()
            .map(|path| RawEvent::new(path.clone(), kind))
            .collect()
    }

    /// Whether this event may lead to a notification or a new watch.
    pub fn is_actionable(&self) -> bool {
        self.kind != RawKind::Other
    }
}

impl From<&EventKind> for RawKind {
    fn from(kind: &EventKind) -> Self {
        match kind {
            EventKind::Create(_) => RawKind::Create,
            // The destination of a move shows up like a fresh path; the stat
            // in the classifier decides what it is. `Any` is what FSEvents
            // reports for both ends of a rename.
            EventKind::Modify(ModifyKind::Name(RenameMode::To | RenameMode::Any)) => {
                RawKind::Create
            }
            EventKind::Modify(ModifyKind::Data(_) | ModifyKind::Any | ModifyKind::Other) => {
                RawKind::Write
            }
            EventKind::Remove(_) => RawKind::Remove,
            EventKind::Modify(_) | EventKind::Access(_) | EventKind::Any | EventKind::Other => {
                RawKind::Other
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, DataChange, MetadataKind, RemoveKind};

    fn kind_of(kind: EventKind) -> RawKind {
        RawKind::from(&kind)
    }

    #[test]
    fn test_acted_upon_kinds() {
        assert_eq!(kind_of(EventKind::Create(CreateKind::File)), RawKind::Create);
        assert_eq!(kind_of(EventKind::Create(CreateKind::Folder)), RawKind::Create);
        assert_eq!(
            kind_of(EventKind::Modify(ModifyKind::Data(DataChange::Content))),
            RawKind::Write
        );
        assert_eq!(kind_of(EventKind::Modify(ModifyKind::Any)), RawKind::Write);
        assert_eq!(kind_of(EventKind::Remove(RemoveKind::File)), RawKind::Remove);
        assert_eq!(
            kind_of(EventKind::Modify(ModifyKind::Name(RenameMode::To))),
            RawKind::Create
        );
    }

    #[test]
    fn test_ignored_kinds() {
        assert_eq!(
            kind_of(EventKind::Modify(ModifyKind::Metadata(MetadataKind::Permissions))),
            RawKind::Other
        );
        assert_eq!(
            kind_of(EventKind::Modify(ModifyKind::Name(RenameMode::From))),
            RawKind::Other
        );
        assert_eq!(
            kind_of(EventKind::Modify(ModifyKind::Name(RenameMode::Both))),
            RawKind::Other
        );
        assert_eq!(kind_of(EventKind::Access(AccessKind::Any)), RawKind::Other);
        assert_eq!(kind_of(EventKind::Other), RawKind::Other);
    }

    #[test]
    fn test_one_raw_event_per_path() {
        let event = Event::new(EventKind::Remove(RemoveKind::Any))
            .add_path(PathBuf::from("/data/a.mp4"))
            .add_path(PathBuf::from("/data/b.mp4"));

        let raw = RawEvent::from_notify(&event);
        assert_eq!(
            raw,
            vec![
                RawEvent::new("/data/a.mp4", RawKind::Remove),
                RawEvent::new("/data/b.mp4", RawKind::Remove),
            ]
        );
        assert!(raw.iter().all(RawEvent::is_actionable));
    }

    #[test]
    fn test_other_is_not_actionable() {
        assert!(!RawEvent::new("/data/a.mp4", RawKind::Other).is_actionable());
    }
}

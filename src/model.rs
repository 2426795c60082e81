use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;

/// One unit of traversal: a single directory waiting to be listed.
///
/// Owned by the executor queue until a worker dequeues it; the worker then
/// owns it for the duration of processing.
#[derive(Debug, Clone)]
pub struct WorkItem {
    pub root: Arc<PathBuf>,
    /// Path of this directory relative to `root`; empty for the root itself.
    pub rel: PathBuf,
    pub depth: usize,
}

impl WorkItem {
    pub fn for_root(root: PathBuf) -> Self {
        Self {
            root: Arc::new(root),
            rel: PathBuf::new(),
            depth: 0,
        }
    }

    pub fn child(&self, name: &std::ffi::OsStr) -> Self {
        Self {
            root: Arc::clone(&self.root),
            rel: self.rel.join(name),
            depth: self.depth + 1,
        }
    }

    pub fn dir_path(&self) -> PathBuf {
        self.root.join(&self.rel)
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum EntryKind {
    File,
    Dir,
}

/// Which entry kinds are forwarded to the match sink.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum EmitKind {
    Files,
    Dirs,
    Both,
}

impl EmitKind {
    pub fn includes(self, kind: EntryKind) -> bool {
        match self {
            Self::Files => kind == EntryKind::File,
            Self::Dirs => kind == EntryKind::Dir,
            Self::Both => true,
        }
    }
}

/// A matched directory entry, as handed to the match sink.
#[derive(Debug, Clone)]
pub struct FoundEntry {
    pub root: Arc<PathBuf>,
    /// Directory containing the entry, relative to `root`.
    pub rel_dir: PathBuf,
    pub name: String,
    pub kind: EntryKind,
    pub size: u64,
    pub modified: Option<SystemTime>,
    pub created: Option<SystemTime>,
    pub accessed: Option<SystemTime>,
}

impl FoundEntry {
    pub fn full_path(&self) -> PathBuf {
        self.root.join(&self.rel_dir).join(&self.name)
    }

    pub fn rel_path(&self) -> PathBuf {
        self.rel_dir.join(&self.name)
    }
}

pub type NamePredicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;
pub type MtimePredicate = Arc<dyn Fn(SystemTime) -> bool + Send + Sync>;

#[derive(Clone)]
pub struct ScanOptions {
    /// `None` means unlimited depth; `Some(0)` lists the roots only.
    pub max_depth: Option<usize>,
    pub follow_junctions: bool,
    pub emit: EmitKind,
    pub worker_count: usize,
    pub match_name: Option<NamePredicate>,
    pub match_mtime: Option<MtimePredicate>,
    pub track_longest_name: bool,
}

impl fmt::Debug for ScanOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanOptions")
            .field("max_depth", &self.max_depth)
            .field("follow_junctions", &self.follow_junctions)
            .field("emit", &self.emit)
            .field("worker_count", &self.worker_count)
            .field("match_name", &self.match_name.is_some())
            .field("match_mtime", &self.match_mtime.is_some())
            .field("track_longest_name", &self.track_longest_name)
            .finish()
    }
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            max_depth: None,
            follow_junctions: false,
            emit: EmitKind::Files,
            worker_count: 4,
            match_name: None,
            match_mtime: None,
            track_longest_name: false,
        }
    }
}

impl ScanOptions {
    pub fn name_matches(&self, name: &str) -> bool {
        self.match_name.as_ref().is_none_or(|matches| matches(name))
    }

    pub fn mtime_matches(&self, mtime: Option<SystemTime>) -> bool {
        match (&self.match_mtime, mtime) {
            (None, _) => true,
            (Some(matches), Some(time)) => matches(time),
            (Some(_), None) => false,
        }
    }
}

/// Events produced by worker threads and consumed by the caller's
/// polling loop. Emission order across directories is unspecified.
#[derive(Debug, Clone)]
pub enum ScanEvent {
    Found(FoundEntry),
    ListError { code: i32, path: PathBuf },
}

pub fn error_code(error: &std::io::Error) -> i32 {
    error.raw_os_error().unwrap_or(-1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emit_kind_filters_entries() {
        assert!(EmitKind::Files.includes(EntryKind::File));
        assert!(!EmitKind::Files.includes(EntryKind::Dir));
        assert!(EmitKind::Dirs.includes(EntryKind::Dir));
        assert!(!EmitKind::Dirs.includes(EntryKind::File));
        assert!(EmitKind::Both.includes(EntryKind::File));
        assert!(EmitKind::Both.includes(EntryKind::Dir));
    }

    #[test]
    fn child_items_extend_relative_path_and_depth() {
        let root = WorkItem::for_root(PathBuf::from("/data"));
        let child = root.child(std::ffi::OsStr::new("sub"));
        assert_eq!(child.depth, 1);
        assert_eq!(child.rel, PathBuf::from("sub"));
        assert_eq!(child.dir_path(), PathBuf::from("/data/sub"));
    }

    #[test]
    fn unset_predicates_accept_everything() {
        let options = ScanOptions::default();
        assert!(options.name_matches("anything"));
        assert!(options.mtime_matches(None));
        assert!(options.mtime_matches(Some(SystemTime::now())));
    }

    #[test]
    fn mtime_predicate_rejects_unknown_timestamps() {
        let mut options = ScanOptions::default();
        options.match_mtime = Some(Arc::new(|_| true));
        assert!(!options.mtime_matches(None));
    }
}

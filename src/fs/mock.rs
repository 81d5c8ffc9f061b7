// src/fs/mock.rs

use super::FileSystem;
use anyhow::{anyhow, Result};
use std::collections::BTreeMap;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

#[derive(Debug, Clone)]
pub enum MockEntry {
    File { content: Vec<u8>, modified: SystemTime },
    Dir,
}

#[derive(Debug, Default)]
struct MockState {
    entries: BTreeMap<PathBuf, MockEntry>,
    /// Logical clock; every write advances it by one second so modification
    /// times are strictly ordered.
    clock: u64,
}

/// In-memory filesystem for tests.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    state: Arc<Mutex<MockState>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        let fs = Self::default();
        fs.state
            .lock()
            .unwrap()
            .entries
            .insert(PathBuf::from("."), MockEntry::Dir);
        fs
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let path = path.as_ref().to_path_buf();
        let mut state = self.state.lock().unwrap();
        state.clock += 1;
        let modified = SystemTime::UNIX_EPOCH + Duration::from_secs(state.clock);
        ensure_ancestors(&mut state.entries, &path);
        state.entries.insert(
            path,
            MockEntry::File {
                content: content.into(),
                modified,
            },
        );
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let path = path.as_ref().to_path_buf();
        let mut state = self.state.lock().unwrap();
        ensure_ancestors(&mut state.entries, &path);
        state.entries.insert(path, MockEntry::Dir);
    }

    /// Bump the modification time of an existing file.
    pub fn touch(&self, path: impl AsRef<Path>) {
        let mut state = self.state.lock().unwrap();
        state.clock += 1;
        let now = SystemTime::UNIX_EPOCH + Duration::from_secs(state.clock);
        if let Some(MockEntry::File { modified, .. }) = state.entries.get_mut(path.as_ref()) {
            *modified = now;
        }
    }

    /// All file paths currently stored under `root`.
    pub fn files_under(&self, root: impl AsRef<Path>) -> Vec<PathBuf> {
        let state = self.state.lock().unwrap();
        state
            .entries
            .iter()
            .filter(|(p, e)| p.starts_with(root.as_ref()) && matches!(e, MockEntry::File { .. }))
            .map(|(p, _)| p.clone())
            .collect()
    }
}

fn ensure_ancestors(entries: &mut BTreeMap<PathBuf, MockEntry>, path: &Path) {
    for ancestor in path.ancestors().skip(1) {
        if ancestor.as_os_str().is_empty() {
            continue;
        }
        entries
            .entry(ancestor.to_path_buf())
            .or_insert(MockEntry::Dir);
    }
}

impl FileSystem for MockFileSystem {
    fn open_read(&self, path: &Path) -> Result<Box<dyn Read + Send>> {
        Ok(Box::new(Cursor::new(self.read(path)?)))
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let state = self.state.lock().unwrap();
        match state.entries.get(path) {
            Some(MockEntry::File { content, .. }) => Ok(content.clone()),
            Some(MockEntry::Dir) => Err(anyhow!("Is a directory: {:?}", path)),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        self.add_file(path, contents);
        Ok(())
    }

    fn copy(&self, from: &Path, to: &Path) -> Result<()> {
        let content = self.read(from)?;
        self.add_file(to, content);
        Ok(())
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        self.add_dir(path);
        Ok(())
    }

    fn remove_dir_all(&self, path: &Path) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.entries.retain(|p, _| !p.starts_with(path));
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        let state = self.state.lock().unwrap();
        state.entries.contains_key(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        let state = self.state.lock().unwrap();
        matches!(state.entries.get(path), Some(MockEntry::File { .. }))
    }

    fn is_dir(&self, path: &Path) -> bool {
        let state = self.state.lock().unwrap();
        matches!(state.entries.get(path), Some(MockEntry::Dir))
    }

    fn modified(&self, path: &Path) -> Result<SystemTime> {
        let state = self.state.lock().unwrap();
        match state.entries.get(path) {
            Some(MockEntry::File { modified, .. }) => Ok(*modified),
            Some(MockEntry::Dir) => Ok(SystemTime::UNIX_EPOCH),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let state = self.state.lock().unwrap();
        match state.entries.get(path) {
            Some(MockEntry::Dir) => Ok(state
                .entries
                .keys()
                .filter(|p| p.parent() == Some(path))
                .cloned()
                .collect()),
            _ => Err(anyhow!("Not a directory or not found: {:?}", path)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_dir_lists_direct_children_only() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/src/a.txt", b"a");
        fs.add_file("/p/src/nested/b.txt", b"b");

        let mut children = fs.read_dir(Path::new("/p/src")).unwrap();
        children.sort();
        assert_eq!(
            children,
            vec![PathBuf::from("/p/src/a.txt"), PathBuf::from("/p/src/nested")]
        );
    }

    #[test]
    fn remove_dir_all_drops_subtree() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/dist/css/a.css", b"a");
        fs.add_file("/p/src/a.scss", b"a");

        fs.remove_dir_all(Path::new("/p/dist")).unwrap();

        assert!(!fs.exists(Path::new("/p/dist")));
        assert!(fs.files_under("/p/dist").is_empty());
        assert!(fs.is_file(Path::new("/p/src/a.scss")));
    }

    #[test]
    fn writes_advance_modification_time() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/a", b"1");
        fs.add_file("/p/b", b"2");
        let a = fs.modified(Path::new("/p/a")).unwrap();
        let b = fs.modified(Path::new("/p/b")).unwrap();
        assert!(b > a);

        fs.touch("/p/a");
        assert!(fs.modified(Path::new("/p/a")).unwrap() > b);
    }
}

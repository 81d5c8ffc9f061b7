// src/watch/hash.rs

use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use blake3::Hasher;
use tracing::{debug, info};

use crate::engine::TaskName;
use crate::fs::FileSystem;

/// Relative path (from the project root) to the hashes file.
pub const HASH_FILE_PATH: &str = ".assetdag/hashes";

/// Compute the hash of a single file.
pub fn compute_file_hash(fs: &dyn FileSystem, path: &Path) -> Result<String> {
    let mut hasher = Hasher::new();
    let mut reader = fs
        .open_read(path)
        .with_context(|| format!("opening file for hashing: {:?}", path))?;
    let mut buf = [0u8; 8192];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}

/// Deterministic hash over the contents of the given files.
///
/// Order of `paths` does not matter; they are sorted first. Paths that are
/// not files (e.g. deleted since listing) are skipped.
pub fn compute_hash_for_paths<I, P>(fs: &dyn FileSystem, paths: I) -> Result<String>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let mut paths_vec: Vec<PathBuf> = paths
        .into_iter()
        .map(|p| p.as_ref().to_path_buf())
        .collect();
    paths_vec.sort();

    let mut hashes = Vec::with_capacity(paths_vec.len());
    for path in paths_vec {
        if fs.is_file(&path) {
            let file_hash = compute_file_hash(fs, &path)?;
            // Path participates so renames change the aggregate.
            hashes.push(format!("{}:{}", path.display(), file_hash));
        }
    }

    let hash = compute_aggregate_hash(&hashes);
    debug!(hash = %hash, files = hashes.len(), "computed aggregate hash");
    Ok(hash)
}

/// Aggregate hash from per-file hashes, which must already be sorted by path.
pub fn compute_aggregate_hash(hashes: &[String]) -> String {
    let mut hasher = Hasher::new();
    for h in hashes {
        hasher.update(h.as_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

/// Abstract storage for per-binding hashes.
pub trait HashStore: Send + Sync {
    fn load(&self, task: &str) -> Result<Option<String>>;
    fn save(&mut self, task: &str, hash: &str) -> Result<()>;
    /// Remove hashes for tasks that are not in `active_tasks`.
    fn prune(&mut self, active_tasks: &[&str]) -> Result<()>;
}

/// Stores hashes in `<root>/.assetdag/hashes`, one `task hash` pair per line.
pub struct FileHashStore {
    root: PathBuf,
    fs: Arc<dyn FileSystem>,
}

impl FileHashStore {
    pub fn new(root: PathBuf, fs: Arc<dyn FileSystem>) -> Self {
        Self { root, fs }
    }

    fn path(&self) -> PathBuf {
        self.root.join(HASH_FILE_PATH)
    }

    fn load_all(&self) -> Result<BTreeMap<TaskName, String>> {
        let path = self.path();
        if !self.fs.exists(&path) {
            return Ok(BTreeMap::new());
        }

        let bytes = self
            .fs
            .read(&path)
            .with_context(|| format!("reading hash file at {:?}", path))?;
        let text = String::from_utf8_lossy(&bytes);

        let map = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .filter_map(|l| l.split_once(char::is_whitespace))
            .map(|(name, hash)| (name.to_string(), hash.trim().to_string()))
            .collect();
        Ok(map)
    }

    fn save_all(&self, map: &BTreeMap<TaskName, String>) -> Result<()> {
        let mut out = String::new();
        for (name, hash) in map {
            out.push_str(name);
            out.push(' ');
            out.push_str(hash);
            out.push('\n');
        }
        let path = self.path();
        self.fs
            .write(&path, out.as_bytes())
            .with_context(|| format!("writing hash file at {:?}", path))
    }
}

impl HashStore for FileHashStore {
    fn load(&self, task: &str) -> Result<Option<String>> {
        Ok(self.load_all()?.get(task).cloned())
    }

    fn save(&mut self, task: &str, hash: &str) -> Result<()> {
        let mut map = self.load_all()?;
        map.insert(task.to_string(), hash.to_string());
        self.save_all(&map)?;
        debug!(task = %task, hash = %hash, "stored binding hash (file)");
        Ok(())
    }

    fn prune(&mut self, active_tasks: &[&str]) -> Result<()> {
        let mut map = self.load_all()?;
        let initial_len = map.len();
        map.retain(|k, _| active_tasks.contains(&k.as_str()));

        if map.len() < initial_len {
            self.save_all(&map)?;
            info!(
                removed = initial_len - map.len(),
                "pruned stale binding hashes (file)"
            );
        }
        Ok(())
    }
}

/// Stores hashes in memory only.
#[derive(Debug, Default)]
pub struct MemoryHashStore {
    map: BTreeMap<TaskName, String>,
}

impl MemoryHashStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HashStore for MemoryHashStore {
    fn load(&self, task: &str) -> Result<Option<String>> {
        Ok(self.map.get(task).cloned())
    }

    fn save(&mut self, task: &str, hash: &str) -> Result<()> {
        self.map.insert(task.to_string(), hash.to_string());
        debug!(task = %task, hash = %hash, "stored binding hash (memory)");
        Ok(())
    }

    fn prune(&mut self, active_tasks: &[&str]) -> Result<()> {
        self.map.retain(|k, _| active_tasks.contains(&k.as_str()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[test]
    fn aggregate_hash_ignores_input_order_but_sees_content() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/a.txt", b"a");
        fs.add_file("/p/b.txt", b"b");

        let h1 = compute_hash_for_paths(&fs, ["/p/a.txt", "/p/b.txt"]).unwrap();
        let h2 = compute_hash_for_paths(&fs, ["/p/b.txt", "/p/a.txt"]).unwrap();
        assert_eq!(h1, h2);

        fs.add_file("/p/b.txt", b"changed");
        let h3 = compute_hash_for_paths(&fs, ["/p/a.txt", "/p/b.txt"]).unwrap();
        assert_ne!(h1, h3);
    }

    #[test]
    fn file_store_round_trips_and_prunes() {
        let fs: Arc<dyn FileSystem> = Arc::new(MockFileSystem::new());
        let mut store = FileHashStore::new(PathBuf::from("/p"), Arc::clone(&fs));

        store.save("css", "abc").unwrap();
        store.save("js", "def").unwrap();
        assert_eq!(store.load("css").unwrap().as_deref(), Some("abc"));

        store.prune(&["js"]).unwrap();
        assert_eq!(store.load("css").unwrap(), None);

        let reopened = FileHashStore::new(PathBuf::from("/p"), fs);
        assert_eq!(reopened.load("js").unwrap().as_deref(), Some("def"));
    }
}

// tests/fs_abstraction.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use assetdag::fs::mock::MockFileSystem;
use assetdag::fs::FileSystem;
use assetdag::graph::{run_task, RunContext, Task};
use assetdag::report::LogReporter;
use assetdag::transform::ops::CopyOperation;
use assetdag::transform::{SourceGlob, Transform};
use assetdag::types::BuildMode;
use assetdag::watch::hash::compute_file_hash;
use assetdag::watch::patterns::{collect_matching_files, WatchBinding};

#[test]
fn mock_fs_hashing() {
    let fs = MockFileSystem::new();
    fs.add_file("test.txt", b"hello world".to_vec());

    let hash = compute_file_hash(&fs, &PathBuf::from("test.txt")).unwrap();
    // blake3 hash of "hello world"
    assert_eq!(hash, "d74981efa70a0c880b8d8c1985d075dbcbf679b99a5f9914e5aaf96b831a9e24");
}

#[test]
fn mock_fs_watch_patterns() {
    let fs = MockFileSystem::new();
    fs.add_file("/p/src/assets/scss/main.scss", b"a".to_vec());
    fs.add_file("/p/src/assets/scss/partials/_x.scss", b"b".to_vec());
    fs.add_file("/p/src/assets/js/app.js", b"c".to_vec());

    let binding = WatchBinding::new("css", "assets/scss/**/*.scss", &[], false).unwrap();
    let files = collect_matching_files(&fs, Path::new("/p/src"), &binding).unwrap();

    assert_eq!(
        files,
        vec![
            PathBuf::from("/p/src/assets/scss/main.scss"),
            PathBuf::from("/p/src/assets/scss/partials/_x.scss"),
        ]
    );
}

fn copy_task(newer_only: bool) -> Arc<Task> {
    let glob = SourceGlob::from_pattern("/p/src", "fonts/*.woff2").unwrap();
    Task::transform(
        Transform::new("fonts", glob, "/p/dist/assets/fonts", Arc::new(CopyOperation))
            .with_newer_only(newer_only),
    )
}

#[tokio::test]
async fn copy_and_clean_through_the_mock() {
    let fs = MockFileSystem::new();
    fs.add_file("/p/src/fonts/a.woff2", b"font-a".to_vec());
    fs.add_file("/p/src/fonts/b.woff2", b"font-b".to_vec());
    fs.add_file("/p/src/fonts/readme.md", b"skip".to_vec());

    let ctx = Arc::new(RunContext::new(
        Arc::new(fs.clone()),
        "/p",
        BuildMode::Development,
        Arc::new(LogReporter),
    ));

    let run = run_task(copy_task(false), Arc::clone(&ctx)).await;
    assert!(run.is_success());
    assert_eq!(fs.read(Path::new("/p/dist/assets/fonts/a.woff2")).unwrap(), b"font-a");
    assert!(!fs.exists(Path::new("/p/dist/assets/fonts/readme.md")));

    let run = run_task(Task::clean("clean", "/p/dist"), ctx).await;
    assert!(run.is_success());
    assert!(!fs.exists(Path::new("/p/dist")));
    assert!(fs.exists(Path::new("/p/src/fonts/a.woff2")));
}

#[tokio::test]
async fn newer_only_skips_sources_older_than_their_output() {
    let fs = MockFileSystem::new();
    fs.add_file("/p/src/fonts/a.woff2", b"v1".to_vec());
    fs.add_file("/p/src/fonts/b.woff2", b"v1".to_vec());

    let ctx = Arc::new(RunContext::new(
        Arc::new(fs.clone()),
        "/p",
        BuildMode::Development,
        Arc::new(LogReporter),
    ));
    let task = copy_task(true);
    let transform = Arc::clone(task.as_transform().unwrap());

    assert_eq!(transform.matched_files(&fs).unwrap().len(), 2);
    assert!(run_task(Arc::clone(&task), Arc::clone(&ctx)).await.is_success());

    // Outputs are now newer than both sources.
    assert!(transform.matched_files(&fs).unwrap().is_empty());

    fs.touch("/p/src/fonts/b.woff2");
    let stale = transform.matched_files(&fs).unwrap();
    assert_eq!(stale.len(), 1);
    assert_eq!(stale[0].relative, PathBuf::from("b.woff2"));
}

// src/transform/ops/copy.rs

use anyhow::Context;
use tracing::trace;

use crate::transform::{Operation, OperationFuture, TransformInput, WriteReport};

/// Byte-for-byte copy of every matched file to `dest/<relative>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CopyOperation;

impl Operation for CopyOperation {
    fn apply(&self, input: TransformInput) -> OperationFuture<'_> {
        Box::pin(async move {
            tokio::task::spawn_blocking(move || {
                let mut report = WriteReport::default();
                for file in &input.files {
                    let target = input.dest_dir.join(&file.relative);
                    input.fs.copy(&file.path, &target)?;
                    trace!(transform = %input.transform, from = ?file.path, to = ?target, "copied");
                    report.written.push(target);
                }
                Ok(report)
            })
            .await
            .context("copy worker panicked")?
        })
    }

    fn describe(&self) -> String {
        "copy".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};
    use std::sync::Arc;

    use super::*;
    use crate::fs::FileSystem;
    use crate::fs::mock::MockFileSystem;
    use crate::transform::SourceFile;
    use crate::types::BuildMode;

    #[tokio::test]
    async fn copies_preserving_relative_structure() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/src/fonts/a.woff", b"A");
        fs.add_file("/p/src/fonts/sub/b.woff", b"B");

        let input = TransformInput {
            transform: "fonts".into(),
            files: vec![
                SourceFile {
                    path: "/p/src/fonts/a.woff".into(),
                    relative: "a.woff".into(),
                },
                SourceFile {
                    path: "/p/src/fonts/sub/b.woff".into(),
                    relative: "sub/b.woff".into(),
                },
            ],
            dest_dir: "/p/dist/fonts".into(),
            work_dir: "/p".into(),
            mode: BuildMode::Development,
            fs: Arc::new(fs.clone()),
        };

        let report = CopyOperation.apply(input).await.unwrap();

        assert_eq!(
            report.written,
            vec![
                PathBuf::from("/p/dist/fonts/a.woff"),
                PathBuf::from("/p/dist/fonts/sub/b.woff")
            ]
        );
        assert_eq!(fs.read(Path::new("/p/dist/fonts/sub/b.woff")).unwrap(), b"B");
    }
}

// src/transform/ops/command.rs

//! External-tool operation: an ordered list of shell command steps.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::StepConfig;
use crate::exec::process::run_shell;
use crate::transform::template::{render, shell_quote};
use crate::transform::{Operation, OperationFuture, SourceFile, TransformInput, WriteReport};
use crate::types::BuildMode;

#[derive(Debug, Clone)]
pub struct CommandOperation {
    steps: Vec<StepConfig>,
}

impl CommandOperation {
    pub fn new(steps: Vec<StepConfig>) -> Self {
        Self { steps }
    }

    pub fn steps(&self) -> &[StepConfig] {
        &self.steps
    }
}

/// `dir/a.scss` + `min.css` -> `dir/a.min.css`.
pub fn with_ext(relative: &Path, ext: &str) -> PathBuf {
    let stem = relative
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    relative.with_file_name(format!("{stem}.{ext}"))
}

fn template_for(step: &StepConfig, mode: BuildMode) -> &str {
    match (&step.production_cmd, mode) {
        (Some(cmd), BuildMode::Production) => cmd,
        _ => &step.cmd,
    }
}

fn quote_path(path: &Path) -> String {
    shell_quote(&path.to_string_lossy())
}

fn per_file_vars(
    step: &StepConfig,
    input: &TransformInput,
    file: &SourceFile,
) -> (BTreeMap<&'static str, String>, Option<PathBuf>) {
    let output = step
        .ext
        .as_deref()
        .map(|ext| input.dest_dir.join(with_ext(&file.relative, ext)));

    let mut vars = BTreeMap::new();
    vars.insert("input", quote_path(&file.path));
    vars.insert("dest", quote_path(&input.dest_dir));
    vars.insert("mode", input.mode.as_str().to_string());
    let name = file
        .path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    vars.insert("name", shell_quote(&name));
    if let Some(ref out) = output {
        vars.insert("output", quote_path(out));
    }
    (vars, output)
}

fn batch_vars(
    step: &StepConfig,
    input: &TransformInput,
) -> (BTreeMap<&'static str, String>, Option<PathBuf>) {
    let output = step.output.as_deref().map(|out| input.dest_dir.join(out));

    let inputs: Vec<String> = input.files.iter().map(|f| quote_path(&f.path)).collect();

    let mut vars = BTreeMap::new();
    vars.insert("inputs", inputs.join(" "));
    vars.insert("dest", quote_path(&input.dest_dir));
    vars.insert("mode", input.mode.as_str().to_string());
    if let Some(ref out) = output {
        vars.insert("output", quote_path(out));
    }
    (vars, output)
}

impl Operation for CommandOperation {
    fn apply(&self, input: TransformInput) -> OperationFuture<'_> {
        Box::pin(async move {
            let mut report = WriteReport::default();
            input.fs.create_dir_all(&input.dest_dir)?;

            for (idx, step) in self.steps.iter().enumerate() {
                let template = template_for(step, input.mode);

                if step.batch {
                    if input.files.is_empty() {
                        debug!(transform = %input.transform, step = idx, "no inputs; skipping batch step");
                        continue;
                    }
                    let (vars, output) = batch_vars(step, &input);
                    if let Some(parent) = output.as_deref().and_then(Path::parent) {
                        input.fs.create_dir_all(parent)?;
                    }
                    let cmdline = render(template, &vars)?;
                    run_shell(&input.transform, &cmdline, &input.work_dir, input.mode).await?;
                    report.written.extend(output);
                    continue;
                }

                for file in &input.files {
                    let (vars, output) = per_file_vars(step, &input, file);
                    if let Some(parent) = output.as_deref().and_then(Path::parent) {
                        input.fs.create_dir_all(parent)?;
                    }
                    let cmdline = render(template, &vars)?;
                    run_shell(&input.transform, &cmdline, &input.work_dir, input.mode).await?;
                    report.written.extend(output);
                }
            }

            Ok(report)
        })
    }

    fn output_for(&self, relative: &Path) -> Option<PathBuf> {
        self.steps
            .iter()
            .find(|s| !s.batch)
            .and_then(|s| s.ext.as_deref())
            .map(|ext| with_ext(relative, ext))
    }

    fn describe(&self) -> String {
        let cmds: Vec<&str> = self.steps.iter().map(|s| s.cmd.as_str()).collect();
        format!("command [{}]", cmds.join("; "))
    }
}

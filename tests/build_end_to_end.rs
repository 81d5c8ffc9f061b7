// tests/build_end_to_end.rs

mod common;
use crate::common::{init_tracing, list_files, load_project, real_context, registry_for, write_file};

use std::error::Error;
use std::fs;

use tempfile::tempdir;

use assetdag::errors::AssetdagError;
use assetdag::graph::TaskState;
use assetdag::invoke_named;
use assetdag::types::BuildMode;

type TestResult = Result<(), Box<dyn Error>>;

const SITE: &str = r#"
[paths]
src = "src"
dist = "dist"

[category.css]
source = "assets/scss/*.scss"
watch = "assets/scss/**/*.scss"
dest = "assets/css"

[category.images]
source = "assets/img/**/*.{png,jpg,svg}"
dest = "assets/img"

[category.html]
source = "**/*.html"
dest = ""

[transform.css]
category = "css"

[[transform.css.step]]
cmd = "cp {input} {output}"
ext = "css"

[[transform.css.step]]
cmd = "cp {input} {output}"
production_cmd = "printf compressed > {output}"
ext = "min.css"

[transform.images]
category = "images"
kind = "copy"

[transform.html]
category = "html"
kind = "copy"
"#;

#[cfg(unix)]
#[tokio::test]
async fn build_compiles_styles_and_tolerates_empty_categories() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let root = dir.path();
    write_file(root, "src/assets/scss/a.scss", "body { color: red }");
    write_file(root, "src/assets/scss/partials/_vars.scss", "$x: 1;");
    write_file(root, "src/index.html", "<html><body>hi</body></html>");

    let cfg = load_project(root, SITE);
    let registry = registry_for(root, &cfg);

    let run = invoke_named(&registry, "build", real_context(root, BuildMode::Development)).await?;

    assert!(run.is_success());
    assert_eq!(run.state_of("images"), Some(&TaskState::Succeeded));
    assert_eq!(
        list_files(&root.join("dist")),
        vec!["assets/css/a.css", "assets/css/a.min.css", "index.html"]
    );
    assert_eq!(
        fs::read_to_string(root.join("dist/assets/css/a.min.css"))?,
        "body { color: red }"
    );
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn production_mode_selects_production_templates() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let root = dir.path();
    write_file(root, "src/assets/scss/a.scss", "body { color: red }");

    let cfg = load_project(root, SITE);
    let registry = registry_for(root, &cfg);

    invoke_named(&registry, "css", real_context(root, BuildMode::Production)).await?;

    assert_eq!(
        fs::read_to_string(root.join("dist/assets/css/a.min.css"))?,
        "compressed"
    );
    assert_eq!(
        fs::read_to_string(root.join("dist/assets/css/a.css"))?,
        "body { color: red }"
    );
    Ok(())
}

#[tokio::test]
async fn copy_transform_is_idempotent_and_byte_identical() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let root = dir.path();
    let png: Vec<u8> = (0u8..=255).cycle().take(4096).collect();
    fs::create_dir_all(root.join("src/assets/img/icons"))?;
    fs::write(root.join("src/assets/img/icons/logo.png"), &png)?;
    write_file(root, "src/assets/img/readme.txt", "not an image");

    let cfg = load_project(root, SITE);
    let registry = registry_for(root, &cfg);
    let ctx = real_context(root, BuildMode::Development);

    invoke_named(&registry, "images", ctx.clone()).await?;
    let first = fs::read(root.join("dist/assets/img/icons/logo.png"))?;
    invoke_named(&registry, "images", ctx).await?;
    let second = fs::read(root.join("dist/assets/img/icons/logo.png"))?;

    assert_eq!(first, png);
    assert_eq!(second, png);
    assert_eq!(list_files(&root.join("dist")), vec!["assets/img/icons/logo.png"]);
    Ok(())
}

#[tokio::test]
async fn clean_empties_the_destination_before_build_writes() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let root = dir.path();
    write_file(root, "src/index.html", "<html></html>");
    write_file(root, "dist/stale/old.css", "stale");

    let cfg = load_project(root, SITE);
    let registry = registry_for(root, &cfg);
    let ctx = real_context(root, BuildMode::Development);

    invoke_named(&registry, "clean", ctx.clone()).await?;
    assert!(!root.join("dist").exists());

    write_file(root, "dist/stale/old.css", "stale");
    let run = invoke_named(&registry, "html", ctx.clone()).await?;
    assert!(run.is_success());
    assert!(root.join("dist/stale/old.css").exists());

    // `build` = series(clean, transforms): stale output is gone afterwards.
    #[cfg(unix)]
    {
        invoke_named(&registry, "build", ctx).await?;
        assert!(!root.join("dist/stale/old.css").exists());
        assert!(root.join("dist/index.html").exists());
    }
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn failing_step_surfaces_as_build_failed() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let root = dir.path();
    write_file(root, "src/app/a.js", "let a;");
    write_file(root, "src/index.html", "<html></html>");

    let cfg = load_project(
        root,
        r#"
[category.js]
source = "app/*.js"
dest = "js"

[category.html]
source = "*.html"

[transform.js]
category = "js"

[[transform.js.step]]
cmd = "echo broken >&2; exit 7"

[transform.html]
category = "html"
kind = "copy"
"#,
    );
    let registry = registry_for(root, &cfg);

    let err = invoke_named(&registry, "build", real_context(root, BuildMode::Development))
        .await
        .unwrap_err();

    match err {
        AssetdagError::BuildFailed { task, failures } => {
            assert_eq!(task, "build");
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].name, "js");
            assert!(failures[0].cause.contains("exited with code 7"), "{}", failures[0].cause);
            assert!(failures[0].cause.contains("broken"));
        }
        other => panic!("expected BuildFailed, got {other:?}"),
    }
    // The sibling transform in the parallel group still ran.
    assert!(root.join("dist/index.html").exists());
    Ok(())
}

#[tokio::test]
async fn unknown_task_name_is_reported() -> TestResult {
    let dir = tempdir()?;
    let root = dir.path();
    let cfg = load_project(root, SITE);
    let registry = registry_for(root, &cfg);

    let err = invoke_named(&registry, "sprites", real_context(root, BuildMode::Development))
        .await
        .unwrap_err();
    assert!(matches!(err, AssetdagError::TaskNotFound(ref n) if n == "sprites"));
    Ok(())
}

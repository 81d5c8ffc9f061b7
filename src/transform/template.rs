// src/transform/template.rs

//! `{placeholder}` expansion for command steps.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use anyhow::{bail, Result};
use regex::{Captures, Regex};

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([a-z_]+)\}").expect("placeholder regex is valid"));

/// Placeholder names used in `template`, in order of appearance.
pub fn placeholders(template: &str) -> Vec<String> {
    PLACEHOLDER
        .captures_iter(template)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Substitute every `{name}` in `template` with `vars[name]`.
///
/// Values are inserted verbatim; quote them with [`shell_quote`] first when
/// they are paths.
pub fn render(template: &str, vars: &BTreeMap<&str, String>) -> Result<String> {
    for name in placeholders(template) {
        if !vars.contains_key(name.as_str()) {
            bail!("placeholder {{{name}}} has no value in `{template}`");
        }
    }

    let rendered = PLACEHOLDER.replace_all(template, |caps: &Captures| {
        vars.get(&caps[1]).cloned().unwrap_or_default()
    });
    Ok(rendered.into_owned())
}

/// Quote a single argument for the platform shell.
pub fn shell_quote(arg: &str) -> String {
    let safe = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_-./=:,+@%".contains(c));
    if safe {
        return arg.to_string();
    }

    if cfg!(windows) {
        format!("\"{}\"", arg.replace('"', "\"\""))
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_placeholders_in_order() {
        assert_eq!(
            placeholders("sass {input} {output} --{mode}"),
            vec!["input", "output", "mode"]
        );
        assert!(placeholders("echo hi").is_empty());
    }

    #[test]
    fn renders_known_placeholders() {
        let mut vars = BTreeMap::new();
        vars.insert("input", "a.scss".to_string());
        vars.insert("output", "out/a.css".to_string());
        assert_eq!(
            render("sass {input} {output}", &vars).unwrap(),
            "sass a.scss out/a.css"
        );
    }

    #[test]
    fn missing_value_is_an_error() {
        let vars = BTreeMap::new();
        assert!(render("sass {input}", &vars).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn quotes_paths_with_spaces() {
        assert_eq!(shell_quote("src/a.scss"), "src/a.scss");
        assert_eq!(shell_quote("my file.scss"), "'my file.scss'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
    }
}

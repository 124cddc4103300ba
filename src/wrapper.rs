use handlebars::Handlebars;
use regex::Regex;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempPath;

use crate::config::WRAPPER_PREFIX;
use crate::error::{McError, McResult};
use crate::extract::CommentReference;

pub const DEFAULT_EDITOR_WRAPPER: &str = r#"#!/bin/sh

exec vim "+/\[{{CommentID}}@[0-9]\+\]" "${@}"
"#;

const TEMPLATE_NAME: &str = "editor_wrapper";

/// Values available to a wrapper template.
#[derive(Debug, Serialize)]
pub struct WrapperBindings<'a> {
    #[serde(rename = "CommentID")]
    pub comment_id: &'a str,
    #[serde(rename = "ReviewURL")]
    pub review_url: &'a str,
}

impl<'a> From<&'a CommentReference> for WrapperBindings<'a> {
    fn from(reference: &'a CommentReference) -> Self {
        Self {
            comment_id: &reference.comment_id,
            review_url: &reference.review_url,
        }
    }
}

/// Compiled editor wrapper template.
pub struct EditorTemplate {
    registry: Handlebars<'static>,
}

/// Rewrites Go-template placeholders (`{{.CommentID}}`) to handlebars ones.
fn normalize_placeholders(source: &str) -> String {
    let dotted = Regex::new(r"\{\{\s*\.([A-Za-z_][A-Za-z0-9_]*)\s*\}\}")
        .expect("placeholder pattern is valid");
    dotted.replace_all(source, "{{${1}}}").into_owned()
}

impl EditorTemplate {
    pub fn parse(source: &str) -> Result<Self, handlebars::TemplateError> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(true);
        registry.register_escape_fn(handlebars::no_escape);
        registry.register_template_string(TEMPLATE_NAME, normalize_placeholders(source))?;
        Ok(Self { registry })
    }

    pub fn builtin() -> Self {
        Self::parse(DEFAULT_EDITOR_WRAPPER).expect("built-in wrapper template parses")
    }

    pub fn from_file(path: &Path) -> McResult<Self> {
        let source = fs::read_to_string(path)
            .map_err(|e| McError::io(format!("can't read template {}", path.display()), e))?;
        Self::parse(&source).map_err(|e| McError::template_parse(path.to_path_buf(), e))
    }

    pub fn render(&self, bindings: &WrapperBindings<'_>) -> McResult<String> {
        self.registry
            .render(TEMPLATE_NAME, bindings)
            .map_err(McError::template_render)
    }
}

/// An executable script on disk, removed when dropped.
#[derive(Debug)]
pub struct WrapperArtifact {
    path: TempPath,
}

impl WrapperArtifact {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(unix)]
fn make_executable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

/// Renders `template` into a fresh executable file under `dir`.
///
/// Any failure removes whatever was created before returning.
pub fn synthesize(
    template: &EditorTemplate,
    bindings: &WrapperBindings<'_>,
    dir: &Path,
) -> McResult<WrapperArtifact> {
    let rendered = template.render(bindings)?;
    let mut file = tempfile::Builder::new()
        .prefix(WRAPPER_PREFIX)
        .tempfile_in(dir)
        .map_err(|e| McError::io("can't create temporary file", e))?;
    let shown: PathBuf = file.path().to_path_buf();
    make_executable(&shown)
        .map_err(|e| McError::io(format!("can't chmod +x <{}>", shown.display()), e))?;
    file.write_all(rendered.as_bytes())
        .and_then(|_| file.flush())
        .map_err(|e| McError::io(format!("can't write <{}>", shown.display()), e))?;
    // The write handle must be closed before the tool execs the file (ETXTBSY).
    Ok(WrapperArtifact {
        path: file.into_temp_path(),
    })
}

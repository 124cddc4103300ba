use std::fmt;
use std::path::PathBuf;

pub const EXIT_OK: i32 = 0;
pub const EXIT_FALLBACK_START: i32 = 1;
pub const EXIT_NO_REFERENCE: i32 = 2;
pub const EXIT_FALLBACK_FAILED: i32 = 3;
pub const EXIT_SETUP: i32 = 4;
pub const EXIT_USAGE: i32 = 64;

pub type McResult<T> = Result<T, McError>;

#[derive(Debug)]
pub enum McError {
    Io {
        context: String,
        source: std::io::Error,
    },
    TemplateParse {
        file: PathBuf,
        source: Box<handlebars::TemplateError>,
    },
    TemplateRender {
        source: Box<handlebars::RenderError>,
    },
}

impl McError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        McError::Io {
            context: context.into(),
            source,
        }
    }

    pub fn template_parse(file: PathBuf, source: handlebars::TemplateError) -> Self {
        McError::TemplateParse {
            file,
            source: Box::new(source),
        }
    }

    pub fn template_render(source: handlebars::RenderError) -> Self {
        McError::TemplateRender {
            source: Box::new(source),
        }
    }
}

impl fmt::Display for McError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            McError::Io { context, source } => write!(f, "{context}: {source}"),
            McError::TemplateParse { file, source } => {
                write!(f, "can't parse template {}: {source}", file.display())
            }
            McError::TemplateRender { source } => write!(f, "can't render template: {source}"),
        }
    }
}

impl std::error::Error for McError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            McError::Io { source, .. } => Some(source),
            McError::TemplateParse { source, .. } => Some(source.as_ref()),
            McError::TemplateRender { source } => Some(source.as_ref()),
        }
    }
}

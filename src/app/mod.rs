use clap::Parser;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::cache::{CacheEntry, CacheStore};
use crate::config::{APP_NAME, AppConfig, LOG_FILTER_ENV};
use crate::error::{
    EXIT_FALLBACK_FAILED, EXIT_FALLBACK_START, EXIT_NO_REFERENCE, EXIT_OK, EXIT_SETUP, EXIT_USAGE,
    McError, McResult,
};
use crate::extract::{CommentReference, ReferenceExtractor};
use crate::process::{
    SubprocessOutcome, report_review_outcome, review_env, run_fallback, run_review_tool,
};
use crate::wrapper::{DEFAULT_EDITOR_WRAPPER, EditorTemplate, WrapperBindings, synthesize};


const ABOUT: &str = "ash mailcap helper.

Expects the e-mail Stash sends when someone comments on a review. Launches
ash for that review with $EDITOR replaced by a generated wrapper that opens
the editor scrolled to the mentioned comment.";

fn wrapper_help() -> String {
    let indented: Vec<String> = DEFAULT_EDITOR_WRAPPER
        .lines()
        .map(|l| if l.is_empty() { String::new() } else { format!("    {l}") })
        .collect();
    format!(
        "Default wrapper for editor:\n\n{}\n\nTemplates see two placeholders: {{{{CommentID}}}} (the comment \
         mentioned in <FILE>) and {{{{ReviewURL}}}} (full review URL). Go-style {{{{.CommentID}}}} also works.",
        indented.join("\n")
    )
}

#[derive(Parser, Debug)]
#[command(name = APP_NAME, version, about = ABOUT, after_help = wrapper_help())]
struct Args {
    /// Notification e-mail to read.
    file: PathBuf,

    /// Template for the editor wrapper; the built-in one is used if omitted.
    #[arg(short = 't', value_name = "TEMPLATE")]
    template: Option<PathBuf>,

    /// Shell command to run when <FILE> has no comment link.
    #[arg(short = 'x', value_name = "ACTION")]
    fallback: Option<String>,

    /// Cache ash output per comment and replay it instead of running ash again.
    /// Interactive editing is not possible with this flag, since output is
    /// duplicated into the cache file.
    #[arg(short = 'c')]
    cache: bool,
}

/// What a single invocation will do, decided before any subprocess runs.
#[derive(Debug)]
pub enum Route {
    Replay(Vec<u8>),
    Delegate {
        reference: CommentReference,
        cache: Option<CacheEntry>,
    },
    Fallback(String),
    FailFast,
}

pub struct Dispatcher<'a> {
    config: &'a AppConfig,
    extractor: &'a ReferenceExtractor,
    template: &'a EditorTemplate,
}

impl<'a> Dispatcher<'a> {
    pub fn new(
        config: &'a AppConfig,
        extractor: &'a ReferenceExtractor,
        template: &'a EditorTemplate,
    ) -> Self {
        Self {
            config,
            extractor,
            template,
        }
    }

    pub fn route(&self, text: &str) -> Route {
        let Some(reference) = self.extractor.extract(text) else {
            return match &self.config.fallback {
                Some(cmdline) => Route::Fallback(cmdline.clone()),
                None => Route::FailFast,
            };
        };
        if !self.config.use_cache {
            return Route::Delegate {
                reference,
                cache: None,
            };
        }
        let store = CacheStore::new(&self.config.temp_dir);
        let mut entry = match store.open(&reference.review_url, &reference.comment_id) {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("{e}; continuing without cache");
                return Route::Delegate {
                    reference,
                    cache: None,
                };
            }
        };
        if !entry.is_hit() {
            log::debug!("cache miss: {}", entry.path().display());
            return Route::Delegate {
                reference,
                cache: Some(entry),
            };
        }
        match entry.read_all() {
            Ok(data) => {
                log::debug!("cache hit: {}", entry.path().display());
                Route::Replay(data)
            }
            Err(e) => {
                log::warn!("{e}; running {} again", self.config.review_tool);
                Route::Delegate {
                    reference,
                    cache: None,
                }
            }
        }
    }

    pub fn execute<W: Write>(&self, route: Route, out: &mut W) -> i32 {
        match route {
            Route::Replay(data) => {
                if let Err(e) = out.write_all(&data).and_then(|_| out.flush()) {
                    log::error!("can't print cached output: {e}");
                }
                EXIT_OK
            }
            Route::Delegate { reference, cache } => {
                self.delegate(&reference, cache.as_ref());
                EXIT_OK
            }
            Route::Fallback(cmdline) => match run_fallback(&self.config.shell, &cmdline) {
                outcome if outcome.success() => EXIT_OK,
                SubprocessOutcome::StartFailed(e) => {
                    log::error!("can't start external command: {e}");
                    EXIT_FALLBACK_START
                }
                other => {
                    log::error!("error running external program: {other}");
                    EXIT_FALLBACK_FAILED
                }
            },
            Route::FailFast => {
                log::error!("specified file does not contain a link to a comment");
                EXIT_NO_REFERENCE
            }
        }
    }

    pub fn dispatch<W: Write>(&self, text: &str, out: &mut W) -> i32 {
        let route = self.route(text);
        self.execute(route, out)
    }

    /// Runs the review tool with a wrapper bound to `reference`. Setup
    /// failures are logged and skip the run; the wrapper is removed on return.
    fn delegate(&self, reference: &CommentReference, cache: Option<&CacheEntry>) {
        let bindings = WrapperBindings::from(reference);
        let artifact = match synthesize(self.template, &bindings, &self.config.temp_dir) {
            Ok(artifact) => artifact,
            Err(e) => {
                log::warn!("{e}; not running {}", self.config.review_tool);
                return;
            }
        };
        let sink = cache.and_then(CacheEntry::claim_for_recording);
        let env = review_env(artifact.path());
        let outcome = run_review_tool(&self.config.review_tool, &reference.review_url, &env, sink);
        report_review_outcome(&self.config.review_tool, &outcome);
    }
}

fn init_logging() {
    let env = env_logger::Env::new().filter_or(LOG_FILTER_ENV, "warn");
    let _ = env_logger::Builder::from_env(env).try_init();
}

fn read_input(path: &Path) -> McResult<String> {
    let data = fs::read(path)
        .map_err(|e| McError::io(format!("can't read specified file {}", path.display()), e))?;
    Ok(String::from_utf8_lossy(&data).into_owned())
}

fn load_template(path: Option<&Path>) -> McResult<EditorTemplate> {
    match path {
        Some(path) => EditorTemplate::from_file(path),
        None => Ok(EditorTemplate::builtin()),
    }
}

pub fn run() -> i32 {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() { EXIT_USAGE } else { EXIT_OK };
        }
    };
    init_logging();

    let config = AppConfig::new(args.file, args.template, args.fallback, args.cache);
    let text = match read_input(&config.input) {
        Ok(text) => text,
        Err(e) => {
            log::error!("{e}");
            return EXIT_SETUP;
        }
    };
    let template = match load_template(config.template.as_deref()) {
        Ok(template) => template,
        Err(e) => {
            log::error!("{e}");
            return EXIT_SETUP;
        }
    };
    let extractor = ReferenceExtractor::new();

    let dispatcher = Dispatcher::new(&config, &extractor, &template);
    // Not locked up front: delegated output is forwarded from other threads.
    dispatcher.dispatch(&text, &mut io::stdout())
}

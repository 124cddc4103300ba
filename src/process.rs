use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use std::thread;

/// `ash` exits with 2 when the user quits the review without changes.
pub const BENIGN_REVIEW_EXIT_CODE: i32 = 2;

const PUMP_BUF_SIZE: usize = 8 * 1024;

#[derive(Debug)]
pub enum SubprocessOutcome {
    StartFailed(io::Error),
    WaitFailed(io::Error),
    ExitedWithCode(i32),
    Signaled(i32),
}

impl SubprocessOutcome {
    pub fn from_status(status: ExitStatus) -> Self {
        if let Some(code) = status.code() {
            return Self::ExitedWithCode(code);
        }
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(sig) = status.signal() {
                return Self::Signaled(sig);
            }
        }
        Self::ExitedWithCode(-1)
    }

    pub fn success(&self) -> bool {
        matches!(self, Self::ExitedWithCode(0))
    }
}

impl fmt::Display for SubprocessOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StartFailed(e) => write!(f, "failed to start: {e}"),
            Self::WaitFailed(e) => write!(f, "lost track of process: {e}"),
            Self::ExitedWithCode(code) => write!(f, "exit status {code}"),
            Self::Signaled(sig) => write!(f, "killed by signal {sig}"),
        }
    }
}

/// Environment for a child process: the inherited variables as a map, with
/// named overrides applied on top.
#[derive(Debug, Clone, Default)]
pub struct EnvBuilder {
    vars: BTreeMap<OsString, OsString>,
}

impl EnvBuilder {
    pub fn inherited() -> Self {
        Self {
            vars: std::env::vars_os().collect(),
        }
    }

    pub fn set(mut self, key: impl AsRef<OsStr>, value: impl AsRef<OsStr>) -> Self {
        self.vars
            .insert(key.as_ref().to_os_string(), value.as_ref().to_os_string());
        self
    }

    pub fn get(&self, key: &str) -> Option<&OsStr> {
        self.vars.get(OsStr::new(key)).map(OsString::as_os_str)
    }

    pub fn apply(&self, cmd: &mut Command) {
        cmd.env_clear().envs(&self.vars);
    }
}

/// Environment handed to the review tool: `EDITOR` points at the wrapper and
/// `HOME` is restated explicitly.
pub fn review_env(editor: &Path) -> EnvBuilder {
    let home = std::env::var_os("HOME").unwrap_or_default();
    EnvBuilder::inherited()
        .set("HOME", home)
        .set("EDITOR", editor)
}

fn describe(program: &str, args: &[&str]) -> String {
    let mut words = vec![program];
    words.extend_from_slice(args);
    shell_words::join(words)
}

/// Runs `cmdline` through `shell` with the caller's stdio.
pub fn run_fallback(shell: &str, cmdline: &str) -> SubprocessOutcome {
    log::debug!("running fallback: {}", describe(shell, &["-c", cmdline]));
    let mut cmd = Command::new(shell);
    cmd.arg("-c")
        .arg(cmdline)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());
    match cmd.status() {
        Ok(status) => SubprocessOutcome::from_status(status),
        Err(e) => SubprocessOutcome::StartFailed(e),
    }
}

/// Copies `src` to `primary` as bytes arrive, duplicating into `sink`.
///
/// A failing sink is dropped with a warning; the primary stream keeps flowing.
fn pump<R: Read, W: Write>(mut src: R, mut primary: W, mut sink: Option<&File>) {
    let mut buf = [0u8; PUMP_BUF_SIZE];
    loop {
        let n = match src.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                log::warn!("can't read review tool output: {e}");
                break;
            }
        };
        let chunk = &buf[..n];
        if let Err(e) = primary.write_all(chunk).and_then(|_| primary.flush()) {
            log::debug!("can't forward review tool output: {e}");
        }
        if let Some(mut file) = sink
            && let Err(e) = file.write_all(chunk)
        {
            log::warn!("can't write cache file: {e}; output will not be cached");
            sink = None;
        }
    }
}

/// Runs `<program> <review_url> review` with `env`.
///
/// With a `sink`, stdout and stderr are duplicated into it while still
/// reaching this process's own streams.
pub fn run_review_tool(
    program: &str,
    review_url: &str,
    env: &EnvBuilder,
    sink: Option<&File>,
) -> SubprocessOutcome {
    let args = [review_url, "review"];
    log::debug!(
        "running review tool: {} (EDITOR={:?})",
        describe(program, &args),
        env.get("EDITOR")
    );
    let mut cmd = Command::new(program);
    cmd.args(args).stdin(Stdio::inherit());
    env.apply(&mut cmd);

    let Some(sink) = sink else {
        cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        return match cmd.status() {
            Ok(status) => SubprocessOutcome::from_status(status),
            Err(e) => SubprocessOutcome::StartFailed(e),
        };
    };

    cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => return SubprocessOutcome::StartFailed(e),
    };
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    thread::scope(|s| {
        if let Some(out) = stdout {
            s.spawn(move || pump(out, io::stdout(), Some(sink)));
        }
        if let Some(err) = stderr {
            s.spawn(move || pump(err, io::stderr(), Some(sink)));
        }
    });
    match child.wait() {
        Ok(status) => SubprocessOutcome::from_status(status),
        Err(e) => SubprocessOutcome::WaitFailed(e),
    }
}

/// Logs a review tool outcome. Exit code 2 is expected and stays quiet.
pub fn report_review_outcome(program: &str, outcome: &SubprocessOutcome) {
    match outcome {
        SubprocessOutcome::ExitedWithCode(0) => {}
        SubprocessOutcome::ExitedWithCode(BENIGN_REVIEW_EXIT_CODE) => {
            log::debug!("{program} exited with benign status {BENIGN_REVIEW_EXIT_CODE}");
        }
        SubprocessOutcome::StartFailed(e) => log::error!("can't run {program}: {e}"),
        SubprocessOutcome::WaitFailed(e) => log::error!("can't wait for {program}: {e}"),
        other => log::error!("{program} exited with: {other}"),
    }
}

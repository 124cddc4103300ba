#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

pub const REVIEW_URL: &str = "http://stash/projects/P/repos/R/pull-requests/7/overview?commentId=42";

/// Mock `ash`: records its argv, the wrapper it was handed and the wrapper's
/// content under `$HOME`, prints a review, and exits with `$MOCK_ASH_EXIT`.
pub const MOCK_ASH: &str = r#"#!/bin/sh
echo "$*" >> "$HOME/ash-calls"
echo "$EDITOR" > "$HOME/editor-path"
cat "$EDITOR" > "$HOME/editor-content"
echo "review of $1"
echo "ash notice" 1>&2
exit "${MOCK_ASH_EXIT:-0}"
"#;

pub struct Sandbox {
    pub home: PathBuf,
    pub tmp: PathBuf,
    pub mock_bin: PathBuf,
    original_path: String,
}

impl Sandbox {
    pub fn new(prefix: &str) -> Self {
        let base = std::env::temp_dir();
        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before unix epoch")
            .as_nanos();
        let home = base.join(format!("{prefix}-home-{}-{ts}", std::process::id()));
        let tmp = base.join(format!("{prefix}-tmp-{}-{ts}", std::process::id()));
        let mock_bin = base.join(format!("{prefix}-mockbin-{}-{ts}", std::process::id()));

        fs::create_dir_all(&home).expect("create temp home dir");
        fs::create_dir_all(&tmp).expect("create temp tmp dir");
        fs::create_dir_all(&mock_bin).expect("create mock bin dir");

        let me = Self {
            home,
            tmp,
            mock_bin,
            original_path: std::env::var("PATH").unwrap_or_default(),
        };
        me.write_mock("ash", MOCK_ASH);
        me
    }

    pub fn write_mock(&self, name: &str, body: &str) {
        let p = self.mock_bin.join(name);
        fs::write(&p, body).expect("write mock");
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = fs::metadata(&p).expect("mock metadata").permissions();
            perms.set_mode(0o755);
            fs::set_permissions(&p, perms).expect("set mock executable");
        }
    }

    pub fn write_mail(&self, body: &str) -> PathBuf {
        let p = self.home.join("mail.txt");
        fs::write(&p, body).expect("write mail");
        p
    }

    pub fn write_file(&self, name: &str, body: &str) -> PathBuf {
        let p = self.home.join(name);
        fs::write(&p, body).expect("write file");
        p
    }

    pub fn run(&self, args: &[&str]) -> Output {
        self.run_with_env(args, &[])
    }

    pub fn run_with_env(&self, args: &[&str], envs: &[(&str, &str)]) -> Output {
        let path = format!("{}:{}", self.mock_bin.display(), self.original_path);
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_ash-mailcap"));
        cmd.args(args)
            .current_dir(&self.home)
            .env("HOME", &self.home)
            .env("TMPDIR", &self.tmp)
            .env("PATH", path)
            .env("EDITOR", "vi")
            .env_remove("ASH_MAILCAP_REVIEW_TOOL")
            .env_remove("ASH_MAILCAP_LOG");
        for (k, v) in envs {
            cmd.env(k, v);
        }
        cmd.output().expect("run ash-mailcap")
    }

    pub fn ash_calls(&self) -> Vec<String> {
        fs::read_to_string(self.home.join("ash-calls"))
            .map(|s| s.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }

    pub fn home_file(&self, name: &str) -> String {
        fs::read_to_string(self.home.join(name)).unwrap_or_else(|e| panic!("read {name}: {e}"))
    }

    pub fn tmp_entries(&self, prefix: &str) -> Vec<PathBuf> {
        fs::read_dir(&self.tmp)
            .expect("read tmp dir")
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with(prefix))
            })
            .collect()
    }
}

impl Drop for Sandbox {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.home);
        let _ = fs::remove_dir_all(&self.tmp);
        let _ = fs::remove_dir_all(&self.mock_bin);
    }
}

pub fn mail_with_link() -> String {
    format!("Alice commented on your pull request.\n\n{REVIEW_URL}\n\nStash\n")
}

pub fn stdout_str(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).to_string()
}

pub fn stderr_str(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).to_string()
}

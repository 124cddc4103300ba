use std::env;
use std::path::PathBuf;

/// Canonical application identity.
pub const APP_NAME: &str = "ash-mailcap";

pub const DEFAULT_REVIEW_TOOL: &str = "ash";
pub const DEFAULT_SHELL: &str = "/bin/sh";
pub const LOG_FILTER_ENV: &str = "ASH_MAILCAP_LOG";

pub const WRAPPER_PREFIX: &str = "ash-mailcap-editor.";
pub const CACHE_PREFIX: &str = "ash-mailcap-cache.";

/// Process-level configuration snapshot.
///
/// Built once in `app::run` from the command line and the environment, then
/// handed to the dispatcher by reference.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub input: PathBuf,
    pub template: Option<PathBuf>,
    pub fallback: Option<String>,
    pub use_cache: bool,
    pub review_tool: String,
    pub shell: String,
    pub temp_dir: PathBuf,
}

fn env_nonempty(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl AppConfig {
    pub fn new(
        input: PathBuf,
        template: Option<PathBuf>,
        fallback: Option<String>,
        use_cache: bool,
    ) -> Self {
        Self {
            input,
            template,
            fallback: fallback.filter(|f| !f.trim().is_empty()),
            use_cache,
            review_tool: env_nonempty("ASH_MAILCAP_REVIEW_TOOL")
                .unwrap_or_else(|| DEFAULT_REVIEW_TOOL.to_string()),
            shell: env_nonempty("ASH_MAILCAP_SHELL").unwrap_or_else(|| DEFAULT_SHELL.to_string()),
            temp_dir: env::temp_dir(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::AppConfig;
    use std::path::PathBuf;

    #[test]
    fn blank_fallback_counts_as_unset() {
        let cfg = AppConfig::new(PathBuf::from("mail"), None, Some("  ".to_string()), false);
        assert_eq!(cfg.fallback, None);
        let cfg = AppConfig::new(PathBuf::from("mail"), None, Some("mutt".to_string()), true);
        assert_eq!(cfg.fallback.as_deref(), Some("mutt"));
        assert!(cfg.use_cache);
    }
}

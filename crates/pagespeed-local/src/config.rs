//! Credential and transport settings.
//!
//! API key precedence: explicit value (CLI flag) > `GOOGLE_PSI_API_KEY` > `.env` in the
//! working directory. Blank values are treated as missing at every level.

use serde::Serialize;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

pub const API_KEY_ENV: &str = "GOOGLE_PSI_API_KEY";
pub const DOTENV_FILE: &str = ".env";

pub const ENDPOINT_ENV: &str = "PAGESPEED_ENDPOINT";
pub const TIMEOUT_MS_ENV: &str = "PAGESPEED_TIMEOUT_MS";
pub const MAX_BODY_BYTES_ENV: &str = "PAGESPEED_MAX_BODY_BYTES";

pub const DEFAULT_ENDPOINT: &str = "https://www.googleapis.com/pagespeedonline/v5/runPagespeed";
pub const DEFAULT_TIMEOUT_MS: u64 = 60_000;
/// Full Lighthouse reports are a few MB; this leaves ample headroom.
pub const DEFAULT_MAX_BODY_BYTES: u64 = 32 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KeySource {
    Flag,
    Env,
    DotEnv,
}

#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey {
    value: String,
    source: KeySource,
}

impl ApiKey {
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn source(&self) -> KeySource {
        self.source
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKey")
            .field("value", &"<redacted>")
            .field("source", &self.source)
            .finish()
    }
}

fn non_blank(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn env_nonempty(k: &str) -> Option<String> {
    non_blank(std::env::var(k).ok())
}

fn env_u64(k: &str) -> Option<u64> {
    env_nonempty(k).and_then(|v| v.parse::<u64>().ok())
}

/// Resolve the key from the process environment and `./.env`.
pub fn resolve_api_key(flag: Option<&str>) -> Option<ApiKey> {
    resolve_api_key_from(flag, std::env::var(API_KEY_ENV).ok(), Path::new(DOTENV_FILE))
}

pub fn resolve_api_key_from(
    flag: Option<&str>,
    env_value: Option<String>,
    dotenv: &Path,
) -> Option<ApiKey> {
    let candidates = [
        (KeySource::Flag, non_blank(flag.map(str::to_string))),
        (KeySource::Env, non_blank(env_value)),
    ];
    for (source, value) in candidates {
        if let Some(value) = value {
            debug!(?source, "api key resolved");
            return Some(ApiKey { value, source });
        }
    }
    let value = read_dotenv_value(dotenv, API_KEY_ENV)?;
    debug!(source = ?KeySource::DotEnv, "api key resolved");
    Some(ApiKey {
        value,
        source: KeySource::DotEnv,
    })
}

/// First `KEY=value` line for `key` in a dotenv file.
///
/// Blank lines and `#` comments are skipped; one layer of surrounding quotes is stripped.
/// A missing or unreadable file reads as "not set".
pub fn read_dotenv_value(path: &Path, key: &str) -> Option<String> {
    let txt = std::fs::read_to_string(path).ok()?;
    for raw in txt.lines() {
        let s = raw.trim();
        if s.is_empty() || s.starts_with('#') {
            continue;
        }
        let Some((k, v)) = s.split_once('=') else {
            continue;
        };
        if k.trim() != key {
            continue;
        }
        let v = v.trim().trim_matches(|c| c == '"' || c == '\'');
        return non_blank(Some(v.to_string()));
    }
    None
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientSettings {
    pub endpoint: String,
    pub timeout_ms: u64,
    pub max_body_bytes: u64,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl ClientSettings {
    /// Defaults overridden by `PAGESPEED_*` env vars. Unparseable numbers fall back.
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            endpoint: env_nonempty(ENDPOINT_ENV).unwrap_or(d.endpoint),
            timeout_ms: env_u64(TIMEOUT_MS_ENV)
                .filter(|ms| *ms > 0)
                .unwrap_or(d.timeout_ms),
            max_body_bytes: env_u64(MAX_BODY_BYTES_ENV)
                .filter(|n| *n > 0)
                .unwrap_or(d.max_body_bytes),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Env vars are process-global; serialize tests that mutate them.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    struct EnvGuard {
        _lock: std::sync::MutexGuard<'static, ()>,
        saved: Vec<(&'static str, Option<String>)>,
    }

    impl EnvGuard {
        fn new(keys: &[&'static str]) -> Self {
            let lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
            let saved = keys.iter().map(|k| (*k, std::env::var(k).ok())).collect::<Vec<_>>();
            for (k, _) in &saved {
                std::env::remove_var(k);
            }
            Self { _lock: lock, saved }
        }

        fn set(&self, k: &str, v: &str) {
            std::env::set_var(k, v);
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for (k, v) in self.saved.drain(..) {
                match v {
                    Some(val) => std::env::set_var(k, val),
                    None => std::env::remove_var(k),
                }
            }
        }
    }

    fn dotenv(contents: &str) -> tempfile::NamedTempFile {
        let f = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(f.path(), contents).unwrap();
        f
    }

    #[test]
    fn flag_beats_env_beats_dotenv() {
        let f = dotenv("GOOGLE_PSI_API_KEY=from-file\n");

        let k = resolve_api_key_from(Some("from-flag"), Some("from-env".into()), f.path()).unwrap();
        assert_eq!((k.value(), k.source()), ("from-flag", KeySource::Flag));

        let k = resolve_api_key_from(None, Some("from-env".into()), f.path()).unwrap();
        assert_eq!((k.value(), k.source()), ("from-env", KeySource::Env));

        let k = resolve_api_key_from(None, None, f.path()).unwrap();
        assert_eq!((k.value(), k.source()), ("from-file", KeySource::DotEnv));
    }

    #[test]
    fn blank_values_fall_through() {
        let f = dotenv("GOOGLE_PSI_API_KEY=from-file\n");
        let k = resolve_api_key_from(Some("  "), Some("".into()), f.path()).unwrap();
        assert_eq!(k.source(), KeySource::DotEnv);
    }

    #[test]
    fn nothing_configured_resolves_to_none() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(resolve_api_key_from(None, None, &tmp.path().join(".env")).is_none());
    }

    #[test]
    fn dotenv_skips_comments_and_strips_quotes() {
        let f = dotenv(
            "# keys\n\nOTHER=1\n#GOOGLE_PSI_API_KEY=commented\nGOOGLE_PSI_API_KEY=\"quoted-key\"\n",
        );
        assert_eq!(
            read_dotenv_value(f.path(), API_KEY_ENV).as_deref(),
            Some("quoted-key")
        );

        let f = dotenv("GOOGLE_PSI_API_KEY='single'\n");
        assert_eq!(read_dotenv_value(f.path(), API_KEY_ENV).as_deref(), Some("single"));
    }

    #[test]
    fn dotenv_blank_value_is_missing() {
        let f = dotenv("GOOGLE_PSI_API_KEY=\"\"\n");
        assert!(read_dotenv_value(f.path(), API_KEY_ENV).is_none());
    }

    #[test]
    fn debug_output_never_contains_the_key() {
        let k = resolve_api_key_from(Some("sekrit-123"), None, Path::new("/nonexistent")).unwrap();
        assert!(!format!("{k:?}").contains("sekrit-123"));
    }

    #[test]
    fn settings_from_env_with_fallbacks() {
        let env = EnvGuard::new(&[ENDPOINT_ENV, TIMEOUT_MS_ENV, MAX_BODY_BYTES_ENV]);
        assert_eq!(ClientSettings::from_env(), ClientSettings::default());

        env.set(ENDPOINT_ENV, "http://127.0.0.1:9/psi");
        env.set(TIMEOUT_MS_ENV, "1500");
        env.set(MAX_BODY_BYTES_ENV, "not-a-number");
        let s = ClientSettings::from_env();
        assert_eq!(s.endpoint, "http://127.0.0.1:9/psi");
        assert_eq!(s.timeout(), Duration::from_millis(1500));
        assert_eq!(s.max_body_bytes, DEFAULT_MAX_BODY_BYTES);
    }
}

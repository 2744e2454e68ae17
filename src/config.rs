//! Store configuration and environment overrides.

use std::env;
use std::time::Duration;

use crate::schema::IdentityKeys;

pub const LOCK_TIMEOUT_ENV: &str = "RECORD_STORE_LOCK_TIMEOUT_MS";

/// Settings shared by every session opened against one record file.
#[derive(Debug, Clone, Default)]
pub struct StoreConfig {
    /// Field names compared when deciding whether a put replaces a record.
    pub identity_keys: IdentityKeys,
    /// Bytes preceding the JSON payload in the host document.
    pub header: Vec<u8>,
    /// Bytes following the JSON payload in the host document.
    pub footer: Vec<u8>,
    /// Give up waiting for the lock after this long. `None` blocks forever.
    pub lock_timeout: Option<Duration>,
}

impl StoreConfig {
    pub fn new(identity_keys: IdentityKeys) -> Self {
        Self {
            identity_keys,
            ..Self::default()
        }
    }

    pub fn with_header(mut self, header: impl Into<Vec<u8>>) -> Self {
        self.header = header.into();
        self
    }

    pub fn with_footer(mut self, footer: impl Into<Vec<u8>>) -> Self {
        self.footer = footer.into();
        self
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = Some(timeout);
        self
    }

    /// Fill unset fields from the environment. Explicit settings win.
    pub fn apply_env(mut self, env: &EnvConfig) -> Self {
        if self.lock_timeout.is_none() {
            self.lock_timeout = env.lock_timeout;
        }
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct EnvConfig {
    pub lock_timeout: Option<Duration>,
}

impl EnvConfig {
    pub fn from_env() -> Self {
        Self {
            lock_timeout: env_millis_opt(LOCK_TIMEOUT_ENV),
        }
    }
}

fn env_millis_opt(key: &str) -> Option<Duration> {
    env::var(key)
        .ok()
        .and_then(|value| value.trim().parse::<u64>().ok())
        .filter(|millis| *millis > 0)
        .map(Duration::from_millis)
}

#[cfg(test)]
mod tests {
    use super::{EnvConfig, StoreConfig, LOCK_TIMEOUT_ENV};
    use crate::schema::IdentityKeys;
    use std::env;
    use std::sync::{Mutex, OnceLock};
    use std::time::Duration;

    struct EnvGuard {
        key: &'static str,
        previous: Option<String>,
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            if let Some(value) = &self.previous {
                env::set_var(self.key, value);
            } else {
                env::remove_var(self.key);
            }
        }
    }

    fn env_lock() -> std::sync::MutexGuard<'static, ()> {
        static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        LOCK.get_or_init(|| Mutex::new(()))
            .lock()
            .expect("env lock poisoned")
    }

    fn set_env_guard(key: &'static str, value: Option<&str>) -> EnvGuard {
        let previous = env::var(key).ok();
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
        EnvGuard { key, previous }
    }

    #[test]
    fn lock_timeout_defaults_to_none() {
        let _lock = env_lock();
        let _guard = set_env_guard(LOCK_TIMEOUT_ENV, None);
        assert!(EnvConfig::from_env().lock_timeout.is_none());
    }

    #[test]
    fn lock_timeout_parses_milliseconds() {
        let _lock = env_lock();
        let _guard = set_env_guard(LOCK_TIMEOUT_ENV, Some(" 2500 "));
        assert_eq!(
            EnvConfig::from_env().lock_timeout,
            Some(Duration::from_millis(2500))
        );
    }

    #[test]
    fn zero_empty_and_garbage_timeouts_are_ignored() {
        let _lock = env_lock();
        for value in ["0", "", "soon", "-5"] {
            let _guard = set_env_guard(LOCK_TIMEOUT_ENV, Some(value));
            assert!(
                EnvConfig::from_env().lock_timeout.is_none(),
                "value {value:?} should be ignored"
            );
        }
    }

    #[test]
    fn explicit_timeout_wins_over_env() {
        let env = EnvConfig {
            lock_timeout: Some(Duration::from_secs(9)),
        };
        let explicit = StoreConfig::new(IdentityKeys::default())
            .with_lock_timeout(Duration::from_secs(1))
            .apply_env(&env);
        assert_eq!(explicit.lock_timeout, Some(Duration::from_secs(1)));

        let inherited = StoreConfig::new(IdentityKeys::default()).apply_env(&env);
        assert_eq!(inherited.lock_timeout, Some(Duration::from_secs(9)));
    }

    #[test]
    fn header_and_footer_accept_text_and_bytes() {
        let config = StoreConfig::default()
            .with_header("<!--\n")
            .with_footer(b"-->\n".to_vec());
        assert_eq!(config.header, b"<!--\n");
        assert_eq!(config.footer, b"-->\n");
    }
}

//! # Turnline Configuration
//!
//! A minimal, framework-agnostic configuration store based on string
//! keys and values. Applications layer configuration however they like
//! and hand a [`TurnConfigSnapshot`] to the engine.
//!
//! ```rust
//! use turn_core::TurnConfig;
//! let mut config = TurnConfig::new();
//!
//! config.set("queue.max_roster_size", "50");
//! config.set("queue.refresh_estimates", "true");
//!
//! let snapshot = config.snapshot();
//! assert_eq!(snapshot.get_usize("queue.max_roster_size"), Some(50));
//! assert_eq!(snapshot.get_bool("queue.refresh_estimates"), Some(true));
//! ```
//!
//! ## Environment overrides
//! [`TurnConfig::load_env`] maps prefixed variables onto dotted keys:
//!
//! ```bash
//! export TURNLINE__QUEUE__MAX_ROSTER_SIZE=25   # queue.max_roster_size
//! ```

use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct TurnConfig {
    values: HashMap<String, String>,
}

impl TurnConfig {
    /// Create an empty config store.
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
        }
    }

    /// Set a configuration key to a string value.
    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.values.insert(key.into(), value.into());
    }

    /// Get a configuration value by key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|s| s.as_str())
    }

    /// Check whether a key is present.
    pub fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Import every variable starting with `prefix`, e.g. `TURNLINE__`.
    ///
    /// `TURNLINE__STORE__MAX_RETRIES` becomes `store.max_retries`.
    /// Returns the number of keys imported.
    pub fn load_env(&mut self, prefix: &str) -> usize {
        self.load_vars(prefix, std::env::vars())
    }

    /// Same as [`load_env`](Self::load_env) over an explicit iterator.
    pub fn load_vars<I>(&mut self, prefix: &str, vars: I) -> usize
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut imported = 0;
        for (key, value) in vars {
            if let Some(stripped) = key.strip_prefix(prefix) {
                let normalized = stripped.to_lowercase().replace("__", ".");
                self.set(normalized, value);
                imported += 1;
            }
        }
        imported
    }

    pub fn snapshot(&self) -> TurnConfigSnapshot {
        TurnConfigSnapshot::new(self.values.clone())
    }
}

/// Immutable, cheaply cloneable view of a [`TurnConfig`].
#[derive(Debug, Clone, Default)]
pub struct TurnConfigSnapshot {
    map: HashMap<String, String>,
}

impl TurnConfigSnapshot {
    pub(crate) fn new(map: HashMap<String, String>) -> Self {
        Self { map }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(|s| s.as_str())
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        self.map.get(key).cloned()
    }

    pub fn get_usize(&self, key: &str) -> Option<usize> {
        self.get(key).and_then(|v| v.trim().parse::<usize>().ok())
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(|v| v.trim().parse::<u64>().ok())
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(|v| v.trim().parse::<i64>().ok())
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(|v| v.trim().parse::<bool>().ok())
    }
}

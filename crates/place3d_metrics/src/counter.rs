//! Named event counters

use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct Counter {
    counters: HashMap<&'static str, u64>,
}

impl Counter {
    pub fn new() -> Self {
        Self {
            counters: HashMap::new(),
        }
    }

    pub fn increment(&mut self, name: &'static str, value: u64) {
        *self.counters.entry(name).or_insert(0) += value;
    }

    pub fn get(&self, name: &str) -> u64 {
        self.counters.get(name).copied().unwrap_or(0)
    }

    /// All counters, sorted by name.
    pub fn snapshot(&self) -> Vec<(&'static str, u64)> {
        let mut all: Vec<_> = self.counters.iter().map(|(&k, &v)| (k, v)).collect();
        all.sort_unstable_by_key(|(name, _)| *name);
        all
    }

    pub fn reset_all(&mut self) {
        self.counters.clear();
    }
}

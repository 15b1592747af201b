use std::{
    collections::HashMap,
    sync::Mutex,
    time::{Duration, Instant},
};

/// Process-local short code → token cache for `/f/{code}` lookups.
/// Entries only save a query; link state is always read from the database.
pub struct ShortCodeCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, (String, Instant)>>,
}

impl ShortCodeCache {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, entries: Mutex::new(HashMap::new()) }
    }

    pub fn get(&self, code: &str) -> Option<String> {
        self.get_at(code, Instant::now())
    }

    fn get_at(&self, code: &str, now: Instant) -> Option<String> {
        let mut entries = self.entries.lock().ok()?;
        match entries.get(code) {
            Some((token, inserted)) if now.duration_since(*inserted) < self.ttl => Some(token.clone()),
            Some(_) => {
                entries.remove(code);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, code: &str, token: &str) {
        self.insert_at(code, token, Instant::now());
    }

    fn insert_at(&self, code: &str, token: &str, now: Instant) {
        if let Ok(mut entries) = self.entries.lock() {
            let ttl = self.ttl;
            entries.retain(|_, (_, inserted)| now.duration_since(*inserted) < ttl);
            entries.insert(code.to_string(), (token.to_string(), now));
        }
    }

    pub fn evict(&self, code: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(code);
        }
    }
}

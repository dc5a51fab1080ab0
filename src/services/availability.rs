use dashmap::DashMap;
use std::time::{Duration, Instant};

/// Symbols a data source recently failed to serve, skipped until their entry expires.
///
/// Owned by the data-access layer. The engine never consults it.
#[derive(Debug)]
pub struct SymbolAvailability {
    unavailable: DashMap<String, Unavailable>,
    ttl: Duration,
}

#[derive(Debug, Clone)]
struct Unavailable {
    reason: String,
    until: Instant,
}

impl SymbolAvailability {
    pub fn new(ttl: Duration) -> Self {
        Self {
            unavailable: DashMap::new(),
            ttl,
        }
    }

    /// Skip `symbol` for the configured TTL.
    pub fn mark_unavailable(&self, symbol: &str, reason: impl Into<String>) {
        self.unavailable.insert(
            symbol.to_uppercase(),
            Unavailable {
                reason: reason.into(),
                until: Instant::now() + self.ttl,
            },
        );
    }

    pub fn mark_available(&self, symbol: &str) {
        self.unavailable.remove(&symbol.to_uppercase());
    }

    /// Why `symbol` is being skipped, if it is. Expired entries are dropped.
    pub fn unavailable_reason(&self, symbol: &str) -> Option<String> {
        let key = symbol.to_uppercase();
        let entry = self.unavailable.get(&key)?;
        if entry.until > Instant::now() {
            Some(entry.reason.clone())
        } else {
            drop(entry);
            self.unavailable.remove(&key);
            None
        }
    }

    pub fn is_available(&self, symbol: &str) -> bool {
        self.unavailable_reason(symbol).is_none()
    }

    /// Drop every expired entry.
    pub fn cleanup(&self) {
        let now = Instant::now();
        self.unavailable.retain(|_, entry| entry.until > now);
    }

    /// Entries currently held, including expired ones not yet cleaned up.
    pub fn len(&self) -> usize {
        self.unavailable.len()
    }

    pub fn is_empty(&self) -> bool {
        self.unavailable.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_and_clear() {
        let cache = SymbolAvailability::new(Duration::from_secs(60));
        assert!(cache.is_available("EURUSD"));

        cache.mark_unavailable("eurusd", "no data file");
        assert!(!cache.is_available("EURUSD"));
        assert_eq!(cache.unavailable_reason("EURUSD").as_deref(), Some("no data file"));

        cache.mark_available("EURUSD");
        assert!(cache.is_available("EURUSD"));
    }

    #[test]
    fn test_entries_expire() {
        let cache = SymbolAvailability::new(Duration::ZERO);
        cache.mark_unavailable("USDJPY", "timeout");
        assert!(cache.is_available("USDJPY"));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_cleanup_drops_expired() {
        let cache = SymbolAvailability::new(Duration::ZERO);
        cache.mark_unavailable("A", "x");
        cache.mark_unavailable("B", "y");
        assert_eq!(cache.len(), 2);
        cache.cleanup();
        assert_eq!(cache.len(), 0);
    }
}

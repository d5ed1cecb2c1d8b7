use std::sync::{Mutex, PoisonError};

/// Status codes that suggest the current exit IP is being blocked
pub const BLOCKING_STATUSES: [u16; 2] = [403, 429];

/// Returns true if the status code should trigger a proxy rotation
pub fn is_blocking_status(status_code: u16) -> bool {
    BLOCKING_STATUSES.contains(&status_code)
}

/// Round-robin proxy selector with blocking-triggered rotation
///
/// The proxy list is fixed at construction. The cursor starts unset, so the
/// first `next()` selects the first proxy. An empty pool always resolves to
/// `None`, meaning a direct connection.
#[derive(Debug)]
pub struct ProxyPool {
    proxies: Vec<String>,
    cursor: Mutex<Option<usize>>,
}

impl ProxyPool {
    pub fn new(proxies: Vec<String>) -> Self {
        Self {
            proxies,
            cursor: Mutex::new(None),
        }
    }

    /// Returns the number of proxies in the pool
    pub fn len(&self) -> usize {
        self.proxies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty()
    }

    /// Returns the last selected proxy without advancing the cursor
    pub fn current(&self) -> Option<String> {
        let cursor = self.cursor.lock().unwrap_or_else(PoisonError::into_inner);
        cursor.and_then(|i| self.proxies.get(i).cloned())
    }

    /// Advances the cursor one step (wrapping) and returns the new proxy
    pub fn next(&self) -> Option<String> {
        if self.proxies.is_empty() {
            return None;
        }

        let mut cursor = self.cursor.lock().unwrap_or_else(PoisonError::into_inner);
        let index = match *cursor {
            Some(i) => (i + 1) % self.proxies.len(),
            None => 0,
        };
        *cursor = Some(index);
        self.proxies.get(index).cloned()
    }

    /// Returns the current proxy, selecting the first one if none is selected yet
    ///
    /// The check and the selection happen under one lock so concurrent first
    /// callers do not each advance the cursor.
    pub fn current_or_next(&self) -> Option<String> {
        if self.proxies.is_empty() {
            return None;
        }

        let mut cursor = self.cursor.lock().unwrap_or_else(PoisonError::into_inner);
        let index = *cursor.get_or_insert(0);
        self.proxies.get(index).cloned()
    }

    /// Rotates to the next proxy iff the status signals blocking
    ///
    /// # Returns
    ///
    /// The proxy that is active after handling the status
    pub fn handle_blocking_status(&self, status_code: u16) -> Option<String> {
        if is_blocking_status(status_code) {
            tracing::debug!(status = status_code, "rotating proxy after blocking status");
            self.next()
        } else {
            self.current()
        }
    }
}

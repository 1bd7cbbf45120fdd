//! Everything a pipe needs that would otherwise be global mutable state
//! (tag interning aside, which stays behind its own read-mostly lock in
//! `logmsg::tags`) is threaded through here and handed to every pipe at
//! `init`.

use dnscache::DnsCacheOptions;
use persist::PersistStore;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Shared services every pipe can reach: the persist store (single
/// writer, serialized by the mutex), the DNS cache
/// configuration each worker uses to build its own per-worker cache, and
/// the cooperative shutdown flag.
pub struct RuntimeContext {
    persist: Arc<Mutex<PersistStore>>,
    dns_cache_options: DnsCacheOptions,
    shutdown: Arc<AtomicBool>,
}

impl RuntimeContext {
    #[must_use]
    pub fn new(persist: PersistStore, dns_cache_options: DnsCacheOptions) -> Self {
        Self {
            persist: Arc::new(Mutex::new(persist)),
            dns_cache_options,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    #[must_use]
    pub fn persist(&self) -> &Arc<Mutex<PersistStore>> {
        &self.persist
    }

    #[must_use]
    pub fn dns_cache_options(&self) -> DnsCacheOptions {
        self.dns_cache_options
    }

    /// Requests cooperative shutdown. Pipes check
    /// [`RuntimeContext::shutdown_requested`] at their yield points and
    /// drain in-flight work rather than stopping mid-message.
    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn shutdown_requested(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }
}

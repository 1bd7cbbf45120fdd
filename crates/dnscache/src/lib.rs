#![deny(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `dnscache` is a per-worker reverse-DNS cache: an LRU map from address to
//! hostname, with separate expiry for positive and negative (failed)
//! lookups, overlaid by a never-evicted table of statically configured
//! hosts.
//!
//! # Design
//!
//! - [`DnsCache::lookup`] checks the static table first, then the LRU
//!   table; an expired dynamic entry is treated as a miss and evicted
//!   lazily on the next lookup that would have hit it.
//! - Time is read through a [`clock::Clock`] so expiry tests can advance
//!   time deterministically instead of sleeping.
//!
//! # Invariants
//!
//! - A static host is never evicted by LRU pressure and never expires.
//! - `store(k, v, positive=true)` followed by `lookup(k)` within
//!   `expire_seconds` returns `(v, true)`; the same pair after
//!   `expire_seconds + ε` is a miss. The negative case uses
//!   `expire_failed_seconds` instead.

pub mod clock;

use clock::{Clock, SystemClock};
use lru::LruCache;
use std::net::IpAddr;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

/// Cache sizing and TTL configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DnsCacheOptions {
    pub cache_size: usize,
    pub expire_seconds: u64,
    pub expire_failed_seconds: u64,
}

impl Default for DnsCacheOptions {
    fn default() -> Self {
        Self {
            cache_size: 1007,
            expire_seconds: 3600,
            expire_failed_seconds: 60,
        }
    }
}

struct DynamicEntry {
    hostname: Box<str>,
    positive: bool,
    expires_at: Instant,
}

/// A successful cache lookup: the cached hostname and whether it was a
/// positive (successful) or negative (failed, cached to avoid repeated
/// lookups) resolution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolution<'a> {
    pub hostname: &'a str,
    pub positive: bool,
}

/// A malformed line in a static-hosts file.
#[derive(Clone, Debug, thiserror::Error)]
#[error("line {line}: expected \"<address> <hostname>\", got {text:?}")]
pub struct StaticHostsParseError {
    pub line: usize,
    pub text: String,
}

/// Per-worker DNS cache.
pub struct DnsCache {
    options: DnsCacheOptions,
    static_hosts: std::collections::HashMap<IpAddr, Box<str>>,
    dynamic: LruCache<IpAddr, DynamicEntry>,
    clock: Box<dyn Clock>,
}

impl DnsCache {
    #[must_use]
    pub fn new(options: DnsCacheOptions) -> Self {
        Self::with_clock(options, Box::new(SystemClock))
    }

    #[must_use]
    pub fn with_clock(options: DnsCacheOptions, clock: Box<dyn Clock>) -> Self {
        let capacity = NonZeroUsize::new(options.cache_size.max(1)).expect("cache_size >= 1");
        Self {
            options,
            static_hosts: std::collections::HashMap::new(),
            dynamic: LruCache::new(capacity),
            clock,
        }
    }

    /// Parses a text file in the `/etc/hosts` format (`<addr> <name>
    /// [alias...]` per line, `#` starts a comment) into the never-evicted
    /// static overlay. Later lines for the same address overwrite earlier
    /// ones.
    pub fn load_static_hosts(&mut self, contents: &str) -> Result<(), StaticHostsParseError> {
        for (line_number, raw_line) in contents.lines().enumerate() {
            let line = match raw_line.find('#') {
                Some(at) => &raw_line[..at],
                None => raw_line,
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let mut fields = line.split_whitespace();
            let addr_text = fields.next().ok_or_else(|| StaticHostsParseError {
                line: line_number + 1,
                text: raw_line.to_string(),
            })?;
            let hostname = fields.next().ok_or_else(|| StaticHostsParseError {
                line: line_number + 1,
                text: raw_line.to_string(),
            })?;
            let addr: IpAddr = addr_text.parse().map_err(|_| StaticHostsParseError {
                line: line_number + 1,
                text: raw_line.to_string(),
            })?;
            self.static_hosts.insert(addr, hostname.into());
        }
        Ok(())
    }

    /// Records a dynamic resolution (or failure) for `addr`.
    pub fn store(&mut self, addr: IpAddr, hostname: &str, positive: bool) {
        let ttl = if positive {
            self.options.expire_seconds
        } else {
            self.options.expire_failed_seconds
        };
        let expires_at = self.clock.now() + Duration::from_secs(ttl);
        self.dynamic.put(
            addr,
            DynamicEntry {
                hostname: hostname.into(),
                positive,
                expires_at,
            },
        );
    }

    /// Looks up `addr`: static hosts first (never expire), then the
    /// dynamic LRU table (expired entries are treated as a miss and
    /// dropped).
    pub fn lookup(&mut self, addr: IpAddr) -> Option<Resolution<'_>> {
        if let Some(hostname) = self.static_hosts.get(&addr) {
            return Some(Resolution {
                hostname,
                positive: true,
            });
        }

        let now = self.clock.now();
        let expired = self
            .dynamic
            .peek(&addr)
            .is_some_and(|entry| entry.expires_at <= now);
        if expired {
            self.dynamic.pop(&addr);
            return None;
        }

        self.dynamic.get(&addr).map(|entry| Resolution {
            hostname: &entry.hostname,
            positive: entry.positive,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.dynamic.len() + self.static_hosts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

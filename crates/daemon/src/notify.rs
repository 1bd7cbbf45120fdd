//! systemd readiness/watchdog notification.
//!
//! Linux-only: gated behind `cfg(target_os = "linux")` since the
//! notification socket is a systemd-specific mechanism. On any other
//! target these become no-ops so callers don't need to `cfg`-gate the
//! call sites themselves.

/// Tells systemd the daemon has finished starting up.
pub fn notify_ready() {
    #[cfg(target_os = "linux")]
    {
        let _ = sd_notify::notify(false, &[sd_notify::NotifyState::Ready]);
    }
}

/// Resets the systemd watchdog timer. Call this periodically if
/// `WatchdogSec=` is set in the unit file; a no-op otherwise.
pub fn notify_watchdog() {
    #[cfg(target_os = "linux")]
    {
        let _ = sd_notify::notify(false, &[sd_notify::NotifyState::Watchdog]);
    }
}

/// Tells systemd the daemon is shutting down.
pub fn notify_stopping() {
    #[cfg(target_os = "linux")]
    {
        let _ = sd_notify::notify(false, &[sd_notify::NotifyState::Stopping]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notifications_do_not_panic_without_a_notify_socket() {
        notify_ready();
        notify_watchdog();
        notify_stopping();
    }
}

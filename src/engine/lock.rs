//! Poll cycle lease lock
//!
//! At most one poll cycle holds the lease at a time. A lease that is not
//! released (crashed or stuck cycle) expires after its TTL so polling can
//! resume. A running cycle renews its lease as it makes progress and must
//! confirm ownership before committing anything. Release happens when the
//! guard drops, and only if the guard still owns the lease.

use parking_lot::Mutex;
use std::time::{Duration, Instant};
use uuid::Uuid;

#[derive(Debug, Clone, Copy)]
struct Lease {
    token: Uuid,
    expires_at: Instant,
}

pub struct PollLock {
    ttl: Duration,
    lease: Mutex<Option<Lease>>,
}

impl PollLock {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            lease: Mutex::new(None),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Take the lease if it is free or expired
    pub fn try_acquire(&self) -> Option<PollLeaseGuard<'_>> {
        let now = Instant::now();
        let mut lease = self.lease.lock();

        if let Some(current) = *lease {
            if current.expires_at > now {
                return None;
            }
            tracing::warn!(lease = %current.token, "Poll lease expired, taking over");
        }

        let token = Uuid::new_v4();
        *lease = Some(Lease {
            token,
            expires_at: now + self.ttl,
        });

        Some(PollLeaseGuard { lock: self, token })
    }

    /// Whether an unexpired lease is held
    pub fn is_held(&self) -> bool {
        self.lease
            .lock()
            .map(|l| l.expires_at > Instant::now())
            .unwrap_or(false)
    }

    fn owns(&self, token: Uuid) -> bool {
        self.lease.lock().map(|l| l.token == token).unwrap_or(false)
    }

    fn renew(&self, token: Uuid) -> bool {
        let mut lease = self.lease.lock();
        match lease.as_mut() {
            Some(current) if current.token == token => {
                current.expires_at = Instant::now() + self.ttl;
                true
            }
            _ => false,
        }
    }

    fn release(&self, token: Uuid) {
        let mut lease = self.lease.lock();
        if lease.map(|l| l.token == token).unwrap_or(false) {
            *lease = None;
        }
    }
}

/// Held lease; releases on drop
pub struct PollLeaseGuard<'a> {
    lock: &'a PollLock,
    token: Uuid,
}

impl PollLeaseGuard<'_> {
    pub fn token(&self) -> Uuid {
        self.token
    }

    /// Whether no other cycle has taken the lease over. An expired lease
    /// that nobody claimed is still owned.
    pub fn still_owned(&self) -> bool {
        self.lock.owns(self.token)
    }

    /// Extend the lease by a full TTL. Returns `false`, changing nothing, if
    /// another cycle has taken it over.
    pub fn renew(&self) -> bool {
        self.lock.renew(self.token)
    }
}

impl Drop for PollLeaseGuard<'_> {
    fn drop(&mut self) {
        self.lock.release(self.token);
    }
}

/// A single committee member. Created on first heartbeat from a previously
/// unknown validator (spec §3 "Validator" lifecycle).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Validator {
    pub last_heartbeat: u64,
}

impl Validator {
    pub fn new(now: u64) -> Self {
        Validator { last_heartbeat: now }
    }

    /// `now <= lastHeartbeat + HEARTBEAT_INTERVAL` (spec §3).
    pub fn is_active(&self, now: u64, heartbeat_interval: u64) -> bool {
        now <= self.last_heartbeat.saturating_add(heartbeat_interval)
    }
}

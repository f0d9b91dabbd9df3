//! Dispatcher buffering: how often the matching tick wakes.

use bevy_ecs::prelude::Resource;

pub trait DispatcherBufferingPolicy: Send + Sync {
    /// Seconds between matching runs.
    fn interval_secs(&self) -> u64;
}

#[derive(Resource)]
pub struct BufferingPolicyResource(pub Box<dyn DispatcherBufferingPolicy>);

/// Fixed rolling horizon: buffer orders and match every `interval_secs`.
#[derive(Debug)]
pub struct RollingBufferingPolicy {
    pub interval_secs: u64,
}

impl Default for RollingBufferingPolicy {
    fn default() -> Self {
        Self { interval_secs: 10 }
    }
}

impl DispatcherBufferingPolicy for RollingBufferingPolicy {
    fn interval_secs(&self) -> u64 {
        self.interval_secs.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_is_never_zero() {
        let policy = RollingBufferingPolicy { interval_secs: 0 };
        assert_eq!(policy.interval_secs(), 1);
    }
}

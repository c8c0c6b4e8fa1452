//! Scheduling engine configuration.
//!
//! # Responsibility
//! - Hold tunables that callers may override per deployment.
//!
//! # Invariants
//! - `max_duration_days` is at least 1.

use crate::access::Role;

/// Default upper sanity bound for `duration_days` requests.
pub const DEFAULT_MAX_DURATION_DAYS: u32 = 365;

/// Runtime settings for the assignment service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulingConfig {
    /// Largest accepted `durationDays` value.
    pub max_duration_days: u32,
    /// Roles allowed to create or remove assignments.
    pub elevated_roles: Vec<Role>,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            max_duration_days: DEFAULT_MAX_DURATION_DAYS,
            elevated_roles: vec![Role::Admin, Role::Supervisor],
        }
    }
}

impl SchedulingConfig {
    /// Overrides the duration bound. Zero is clamped to one day.
    pub fn with_max_duration_days(mut self, max_duration_days: u32) -> Self {
        self.max_duration_days = max_duration_days.max(1);
        self
    }

    /// Replaces the roles allowed past the scheduling gate.
    pub fn with_elevated_roles(mut self, roles: Vec<Role>) -> Self {
        self.elevated_roles = roles;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::{SchedulingConfig, DEFAULT_MAX_DURATION_DAYS};
    use crate::access::Role;

    #[test]
    fn default_allows_admin_and_supervisor() {
        let config = SchedulingConfig::default();
        assert_eq!(config.max_duration_days, DEFAULT_MAX_DURATION_DAYS);
        assert!(config.elevated_roles.contains(&Role::Admin));
        assert!(config.elevated_roles.contains(&Role::Supervisor));
        assert!(!config.elevated_roles.contains(&Role::Tester));
    }

    #[test]
    fn zero_duration_bound_is_clamped() {
        let config = SchedulingConfig::default().with_max_duration_days(0);
        assert_eq!(config.max_duration_days, 1);
    }

    #[test]
    fn elevated_roles_are_replaced_not_merged() {
        let config = SchedulingConfig::default().with_elevated_roles(vec![Role::Tester]);
        assert_eq!(config.elevated_roles, vec![Role::Tester]);
    }
}

//! Runtime configuration for the data registry.

use std::time::Duration;

use crate::satisfaction::SatisfactionStrategy;

/// Default satisfaction strategy.
pub const DEFAULT_SATISFACTION: SatisfactionStrategy = SatisfactionStrategy::FineGrained;

/// Registry settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Strategy for queries whose matchers allow splitting
    pub satisfaction: SatisfactionStrategy,
    /// Expiration for deposits that do not set their own (`None` = never)
    pub default_expiration: Option<Duration>,
    /// Limit on a single provider call (`None` = unbounded)
    pub query_timeout: Option<Duration>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            satisfaction: DEFAULT_SATISFACTION,
            default_expiration: None,
            query_timeout: None,
        }
    }
}

impl RegistryConfig {
    pub fn with_satisfaction(mut self, strategy: SatisfactionStrategy) -> Self {
        self.satisfaction = strategy;
        self
    }

    pub fn with_default_expiration(mut self, expiration: Duration) -> Self {
        self.default_expiration = Some(expiration);
        self
    }

    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = Some(timeout);
        self
    }
}

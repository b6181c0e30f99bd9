//! Engine configuration.

/// Pool sizing for an [`Engine`](crate::Engine).
///
/// Initial sizes pre-size the free lists; max sizes bound how many detached
/// instances are retained for reuse before excess instances are returned to
/// the allocator.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Free-list capacity reserved for entities up front.
    pub entity_pool_initial_size: usize,
    /// Maximum number of pooled entities.
    pub entity_pool_max_size: usize,
    /// Free-list capacity reserved per component type up front.
    pub component_pool_initial_size: usize,
    /// Maximum number of pooled components per type.
    pub component_pool_max_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            entity_pool_initial_size: 10,
            entity_pool_max_size: 100,
            component_pool_initial_size: 10,
            component_pool_max_size: 100,
        }
    }
}

impl EngineConfig {
    /// Overrides the entity pool bounds.
    #[must_use]
    pub fn with_entity_pool(mut self, initial_size: usize, max_size: usize) -> Self {
        self.entity_pool_initial_size = initial_size;
        self.entity_pool_max_size = max_size;
        self
    }

    /// Overrides the per-type component pool bounds.
    #[must_use]
    pub fn with_component_pools(mut self, initial_size: usize, max_size: usize) -> Self {
        self.component_pool_initial_size = initial_size;
        self.component_pool_max_size = max_size;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_pool_sizes() {
        let config = EngineConfig::default();
        assert_eq!(config.entity_pool_initial_size, 10);
        assert_eq!(config.entity_pool_max_size, 100);
        assert_eq!(config.component_pool_initial_size, 10);
        assert_eq!(config.component_pool_max_size, 100);
    }

    #[test]
    fn test_builder_overrides() {
        let config = EngineConfig::default()
            .with_entity_pool(0, 8)
            .with_component_pools(2, 4);
        assert_eq!(config.entity_pool_max_size, 8);
        assert_eq!(config.component_pool_initial_size, 2);
        assert_eq!(config.component_pool_max_size, 4);
    }
}

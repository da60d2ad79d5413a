//! Static collection of configured adapters. Pure lookup, no logic;
//! registration order is the order search results are merged in.

use std::sync::Arc;

use super::SupplierAdapter;

#[derive(Default)]
pub struct AdapterRegistry {
    adapters: Vec<Arc<dyn SupplierAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ids must be unique; a duplicate registration replaces nothing and
    /// panics early, since the registry is built once at startup from
    /// static configuration.
    pub fn register(&mut self, adapter: Arc<dyn SupplierAdapter>) {
        assert!(
            self.get(adapter.id()).is_none(),
            "duplicate supplier adapter id: {}",
            adapter.id()
        );
        self.adapters.push(adapter);
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn SupplierAdapter>> {
        self.adapters.iter().find(|a| a.id() == id).cloned()
    }

    pub fn all(&self) -> &[Arc<dyn SupplierAdapter>] {
        &self.adapters
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::suppliers::sample::SampleSupplier;

    #[test]
    fn lookup_by_id_and_order_preserved() {
        let mut registry = AdapterRegistry::new();
        registry.register(Arc::new(SampleSupplier::new()));
        assert_eq!(registry.len(), 1);
        assert!(registry.get("sample").is_some());
        assert!(registry.get("nope").is_none());
        assert_eq!(registry.all()[0].id(), "sample");
    }

    #[test]
    #[should_panic(expected = "duplicate supplier adapter id")]
    fn duplicate_ids_are_rejected() {
        let mut registry = AdapterRegistry::new();
        registry.register(Arc::new(SampleSupplier::new()));
        registry.register(Arc::new(SampleSupplier::new()));
    }
}

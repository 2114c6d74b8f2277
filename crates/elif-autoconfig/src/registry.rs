use crate::error::AssemblyError;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

type Component = Arc<dyn Any + Send + Sync>;

/// Typed registry of assembled components; one type may hold several components
#[derive(Default)]
pub struct ComponentRegistry {
    components: HashMap<TypeId, Vec<Component>>,
    type_names: HashMap<TypeId, &'static str>,
}

impl ComponentRegistry {
    /// Create a new, empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component and return the shared handle
    pub fn register<T>(&mut self, component: T) -> Arc<T>
    where
        T: Send + Sync + 'static,
    {
        let shared = Arc::new(component);
        self.register_shared(shared.clone());
        shared
    }

    /// Register an already shared component
    pub fn register_shared<T>(&mut self, component: Arc<T>)
    where
        T: Send + Sync + 'static,
    {
        let type_id = TypeId::of::<T>();
        tracing::debug!("Registering component {}", std::any::type_name::<T>());
        self.type_names.insert(type_id, std::any::type_name::<T>());
        self.components.entry(type_id).or_default().push(component);
    }

    /// First component registered for `T`
    pub fn get<T>(&self) -> Option<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        self.components
            .get(&TypeId::of::<T>())?
            .first()
            .and_then(|component| component.clone().downcast::<T>().ok())
    }

    /// Like [`ComponentRegistry::get`], failing with [`AssemblyError::MissingComponent`]
    pub fn require<T>(&self) -> Result<Arc<T>, AssemblyError>
    where
        T: Send + Sync + 'static,
    {
        self.get::<T>()
            .ok_or_else(AssemblyError::missing_component::<T>)
    }

    /// Every component registered for `T`, in registration order
    pub fn components_of<T>(&self) -> Vec<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        self.components
            .get(&TypeId::of::<T>())
            .map(|components| {
                components
                    .iter()
                    .filter_map(|component| component.clone().downcast::<T>().ok())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of components registered for `T`
    pub fn count<T: 'static>(&self) -> usize {
        self.components
            .get(&TypeId::of::<T>())
            .map_or(0, Vec::len)
    }

    /// Check if a component type is available
    pub fn contains<T: 'static>(&self) -> bool {
        self.count::<T>() > 0
    }

    /// Total number of registered components
    pub fn len(&self) -> usize {
        self.components.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Type names of everything registered, sorted
    pub fn type_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.type_names.values().copied().collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentRegistry")
            .field("components", &self.type_names())
            .field("count", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Clock(u32);

    #[derive(Debug)]
    struct Mailer;

    #[test]
    fn test_register_and_resolve() {
        let mut registry = ComponentRegistry::new();
        let first = registry.register(Clock(1));
        registry.register(Clock(2));

        assert_eq!(registry.count::<Clock>(), 2);
        assert!(Arc::ptr_eq(&first, &registry.get::<Clock>().unwrap()));
        assert_eq!(
            registry.components_of::<Clock>().iter().map(|c| c.0).collect::<Vec<_>>(),
            vec![1, 2]
        );
    }

    #[test]
    fn test_missing_component() {
        let registry = ComponentRegistry::new();
        assert!(!registry.contains::<Mailer>());
        assert!(registry.components_of::<Mailer>().is_empty());

        match registry.require::<Mailer>() {
            Err(AssemblyError::MissingComponent { component_type }) => {
                assert!(component_type.ends_with("Mailer"));
            }
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_len_and_names() {
        let mut registry = ComponentRegistry::new();
        assert!(registry.is_empty());
        registry.register(Mailer);
        registry.register_shared(Arc::new(Clock(3)));
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.type_names().len(), 2);
    }
}

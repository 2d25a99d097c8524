//! Per-document services
//!
//! A type-keyed map holding document-scoped singletons. Services are
//! handed out as `Rc<T>`, so a caller can keep one across calls that
//! borrow the document mutably; interior mutability is up to `T`.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Typed service map
#[derive(Default)]
pub struct Services {
    entries: HashMap<TypeId, Rc<dyn Any>>,
}

impl Services {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a service if one was installed
    pub fn get<T: Any>(&self) -> Option<Rc<T>> {
        self.entries
            .get(&TypeId::of::<T>())
            .cloned()
            .and_then(|rc| rc.downcast::<T>().ok())
    }

    /// Get a service, installing `T::default()` on first use
    pub fn get_or_default<T: Any + Default>(&mut self) -> Rc<T> {
        if let Some(existing) = self.get::<T>() {
            return existing;
        }
        let service = Rc::new(T::default());
        self.entries.insert(TypeId::of::<T>(), service.clone());
        service
    }

    /// Install a service, returning the one it replaced
    pub fn insert<T: Any>(&mut self, service: Rc<T>) -> Option<Rc<T>> {
        self.entries
            .insert(TypeId::of::<T>(), service)
            .and_then(|rc| rc.downcast::<T>().ok())
    }

    pub fn remove<T: Any>(&mut self) -> Option<Rc<T>> {
        self.entries
            .remove(&TypeId::of::<T>())
            .and_then(|rc| rc.downcast::<T>().ok())
    }

    pub fn contains<T: Any>(&self) -> bool {
        self.entries.contains_key(&TypeId::of::<T>())
    }
}

impl fmt::Debug for Services {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Services").field("len", &self.entries.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[derive(Default)]
    struct Counter(Cell<u32>);

    #[test]
    fn test_get_or_default_is_shared() {
        let mut services = Services::new();
        assert!(services.get::<Counter>().is_none());

        services.get_or_default::<Counter>().0.set(5);
        assert_eq!(services.get_or_default::<Counter>().0.get(), 5);
        assert!(services.contains::<Counter>());
    }

    #[test]
    fn test_insert_replaces() {
        let mut services = Services::new();
        services.insert(Rc::new(Counter(Cell::new(1))));
        let old = services.insert(Rc::new(Counter(Cell::new(2)))).unwrap();
        assert_eq!(old.0.get(), 1);
        assert_eq!(services.remove::<Counter>().unwrap().0.get(), 2);
        assert!(!services.contains::<Counter>());
    }
}

//! Mapping from HTTP methods to tree slots.
//!
//! Conventional methods occupy fixed slots so the hot path never hashes.
//! Extension methods are assigned slots from [`FIRST_CUSTOM_SLOT`] upward in
//! registration order, which also defines their canonical `Allow` order.

use std::collections::HashMap;

use http::Method;

/// Number of slots reserved for conventional methods, including one spare.
pub const FIXED_SLOTS: usize = 10;

/// First slot handed out to an extension method.
pub const FIRST_CUSTOM_SLOT: usize = FIXED_SLOTS;

/// Returns the fixed slot of a conventional method.
#[must_use]
pub fn fixed_slot(method: &Method) -> Option<usize> {
    let slot = match *method {
        Method::GET => 0,
        Method::POST => 1,
        Method::PUT => 2,
        Method::DELETE => 3,
        Method::PATCH => 4,
        Method::HEAD => 5,
        Method::OPTIONS => 6,
        Method::CONNECT => 7,
        Method::TRACE => 8,
        _ => return None,
    };
    Some(slot)
}

/// Assigns every method a stable slot index.
#[derive(Debug, Clone)]
pub struct MethodRegistry {
    custom: HashMap<String, usize>,
    /// Method occupying each slot; `None` for the reserved spare.
    slots: Vec<Option<Method>>,
}

impl Default for MethodRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MethodRegistry {
    /// Creates a registry holding only the conventional methods.
    #[must_use]
    pub fn new() -> Self {
        let slots = vec![
            Some(Method::GET),
            Some(Method::POST),
            Some(Method::PUT),
            Some(Method::DELETE),
            Some(Method::PATCH),
            Some(Method::HEAD),
            Some(Method::OPTIONS),
            Some(Method::CONNECT),
            Some(Method::TRACE),
            None,
        ];
        debug_assert_eq!(slots.len(), FIXED_SLOTS);
        Self {
            custom: HashMap::new(),
            slots,
        }
    }

    /// Returns the slot for `method`, allocating one for a new extension
    /// method. Registering the same method again returns the same slot.
    pub fn register(&mut self, method: &Method) -> usize {
        if let Some(slot) = self.slot(method) {
            return slot;
        }
        let slot = self.slots.len();
        self.slots.push(Some(method.clone()));
        self.custom.insert(method.as_str().to_owned(), slot);
        tracing::debug!(method = %method, slot, "registered custom method");
        slot
    }

    /// Returns the slot for `method` without allocating one.
    #[must_use]
    pub fn slot(&self, method: &Method) -> Option<usize> {
        fixed_slot(method).or_else(|| self.custom.get(method.as_str()).copied())
    }

    /// Returns the method stored in `slot`.
    #[must_use]
    pub fn method(&self, slot: usize) -> Option<&Method> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    /// Total number of slots, fixed ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns false: the conventional slots always exist.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Iterates `(slot, method)` in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Method)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(slot, method)| method.as_ref().map(|m| (slot, m)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_slots() {
        let registry = MethodRegistry::new();
        assert_eq!(registry.slot(&Method::GET), Some(0));
        assert_eq!(registry.slot(&Method::OPTIONS), Some(6));
        assert_eq!(registry.slot(&Method::TRACE), Some(8));
        assert_eq!(registry.method(9), None);
        assert_eq!(registry.len(), FIXED_SLOTS);
    }

    #[test]
    fn test_custom_methods_are_idempotent() {
        let mut registry = MethodRegistry::new();
        let purge = Method::from_bytes(b"PURGE").unwrap();
        let report = Method::from_bytes(b"REPORT").unwrap();

        assert_eq!(registry.register(&purge), FIRST_CUSTOM_SLOT);
        assert_eq!(registry.register(&report), FIRST_CUSTOM_SLOT + 1);
        assert_eq!(registry.register(&purge), FIRST_CUSTOM_SLOT);
        assert_eq!(registry.register(&Method::PATCH), 4);
        assert_eq!(registry.len(), FIXED_SLOTS + 2);
        assert_eq!(registry.method(FIRST_CUSTOM_SLOT + 1), Some(&report));
    }

    #[test]
    fn test_unknown_method_has_no_slot() {
        let registry = MethodRegistry::new();
        let lock = Method::from_bytes(b"LOCK").unwrap();
        assert_eq!(registry.slot(&lock), None);
    }

    #[test]
    fn test_iter_skips_reserved_slot() {
        let mut registry = MethodRegistry::new();
        registry.register(&Method::from_bytes(b"PURGE").unwrap());
        let slots: Vec<usize> = registry.iter().map(|(slot, _)| slot).collect();
        assert_eq!(slots, vec![0, 1, 2, 3, 4, 5, 6, 7, 8, 10]);
    }
}

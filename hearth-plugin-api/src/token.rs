//! Typed capability identifiers and type-erased service instances

use std::any::{Any, type_name};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::PluginError;

/// Identifier of a capability together with the type of its instance.
///
/// Tokens are usually declared as constants next to the trait or struct
/// they describe:
///
/// ```
/// use hearth_plugin_api::Token;
///
/// pub struct Paths {
///     pub base_url: String,
/// }
///
/// pub const PATHS: Token<Paths> = Token::new("hearth:paths");
/// assert_eq!(PATHS.name(), "hearth:paths");
/// ```
pub struct Token<T> {
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Token<T> {
    /// Create a token for the capability `name`
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }

    /// Capability name used in manifests and the service registry
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<T: Any + Send + Sync> Token<T> {
    /// Wrap an instance as the service this token identifies
    pub fn provide(&self, value: T) -> Service {
        self.provide_arc(Arc::new(value))
    }

    /// Wrap a shared instance as the service this token identifies
    pub fn provide_arc(&self, value: Arc<T>) -> Service {
        Service {
            capability: self.name.to_string(),
            type_name: type_name::<T>(),
            value,
        }
    }

    /// Recover the typed instance from an erased service
    pub fn downcast(&self, service: &Service) -> Result<Arc<T>, PluginError> {
        if service.capability != self.name {
            return Err(PluginError::UnresolvedCapability(self.name.to_string()));
        }
        service
            .value
            .clone()
            .downcast::<T>()
            .map_err(|_| PluginError::TypeMismatch {
                capability: self.name.to_string(),
                expected: type_name::<T>(),
                found: service.type_name,
            })
    }
}

impl<T> Clone for Token<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Token<T> {}

impl<T> fmt::Debug for Token<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Token").field(&self.name).finish()
    }
}

/// A provided capability instance with its type erased
#[derive(Clone)]
pub struct Service {
    capability: String,
    type_name: &'static str,
    value: Arc<dyn Any + Send + Sync>,
}

impl Service {
    /// Capability this instance was provided for
    pub fn capability(&self) -> &str {
        &self.capability
    }

    /// Rust type name of the instance
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// True when both services share the same instance
    pub fn ptr_eq(&self, other: &Service) -> bool {
        Arc::ptr_eq(&self.value, &other.value)
    }
}

impl fmt::Debug for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Service")
            .field("capability", &self.capability)
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Paths {
        base_url: String,
    }

    const PATHS: Token<Paths> = Token::new("test:paths");
    const WRONG: Token<u32> = Token::new("test:paths");

    #[test]
    fn test_provide_and_downcast() {
        let service = PATHS.provide(Paths {
            base_url: "/lab".into(),
        });
        assert_eq!(service.capability(), "test:paths");

        let paths = PATHS.downcast(&service).unwrap();
        assert_eq!(paths.base_url, "/lab");
    }

    #[test]
    fn test_downcast_type_mismatch() {
        let service = PATHS.provide(Paths {
            base_url: "/".into(),
        });
        let err = WRONG.downcast(&service).unwrap_err();
        assert!(matches!(err, PluginError::TypeMismatch { .. }));
        assert!(err.to_string().contains("test:paths"));
    }

    #[test]
    fn test_downcast_other_capability_is_unresolved() {
        const OTHER: Token<Paths> = Token::new("test:other");
        let service = PATHS.provide(Paths {
            base_url: "/".into(),
        });
        let err = OTHER.downcast(&service).unwrap_err();
        assert!(matches!(err, PluginError::UnresolvedCapability(name) if name == "test:other"));
    }

    #[test]
    fn test_clones_share_instance() {
        let service = PATHS.provide(Paths {
            base_url: "/".into(),
        });
        let copy = service.clone();
        assert!(service.ptr_eq(&copy));

        let a = PATHS.downcast(&service).unwrap();
        let b = PATHS.downcast(&copy).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }
}

//! Service registry - capability id to provided instance
//!
//! Each capability is registered at most once and never removed. The
//! activation engine is the only writer; everything else reads.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use hearth_plugin_api::{PluginError, Service, Token};

use crate::error::ServiceError;

/// Write-once map from capability id to service instance
#[derive(Debug, Default)]
pub struct ServiceRegistry {
    services: HashMap<String, Service>,
    /// Capabilities in registration order
    order: Vec<String>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a service under its capability
    pub fn register(&mut self, service: Service) -> Result<(), ServiceError> {
        let capability = service.capability().to_string();
        if self.services.contains_key(&capability) {
            return Err(ServiceError::DuplicateCapability { capability });
        }
        tracing::debug!(capability = %capability, type_name = service.type_name(), "Service registered");
        self.order.push(capability.clone());
        self.services.insert(capability, service);
        Ok(())
    }

    /// The erased service for a capability
    pub fn get(&self, capability: &str) -> Option<&Service> {
        self.services.get(capability)
    }

    /// Resolve a typed instance
    pub fn resolve<T: Any + Send + Sync>(&self, token: &Token<T>) -> Result<Arc<T>, ServiceError> {
        let service = self
            .services
            .get(token.name())
            .ok_or_else(|| ServiceError::UnresolvedCapability {
                capability: token.name().to_string(),
            })?;
        token.downcast(service).map_err(|e| match e {
            PluginError::TypeMismatch {
                capability,
                expected,
                found,
            } => ServiceError::TypeMismatch {
                capability,
                expected,
                found,
            },
            _ => ServiceError::UnresolvedCapability {
                capability: token.name().to_string(),
            },
        })
    }

    /// Resolve a typed instance, `None` when nothing is registered.
    ///
    /// A type mismatch is still an error.
    pub fn resolve_optional<T: Any + Send + Sync>(
        &self,
        token: &Token<T>,
    ) -> Result<Option<Arc<T>>, ServiceError> {
        if !self.contains(token.name()) {
            return Ok(None);
        }
        self.resolve(token).map(Some)
    }

    pub fn contains(&self, capability: &str) -> bool {
        self.services.contains_key(capability)
    }

    /// Registered capabilities in registration order
    pub fn capabilities(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

//! The named parameter namespace shared between stacks.
//!
//! Stacks deploy independently, so cross-stack values travel through SSM
//! parameters. The store records which stack publishes each key, letting
//! composition reject reads with no producer and keys claimed twice.

use std::collections::BTreeMap;

use stackforge_common::error::{Result, StackforgeError};
use stackforge_common::types::{ParameterKey, StackName};

/// Typed handle to a published parameter.
///
/// Returned by the producing stack and handed to consumers, so the
/// producer/consumer relation is visible to the compiler.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParameterRef {
    key: ParameterKey,
    producer: StackName,
}

impl ParameterRef {
    pub(crate) const fn new(key: ParameterKey, producer: StackName) -> Self {
        Self { key, producer }
    }

    /// The parameter key.
    #[must_use]
    pub const fn key(&self) -> &ParameterKey {
        &self.key
    }

    /// The stack that writes the parameter.
    #[must_use]
    pub const fn producer(&self) -> &StackName {
        &self.producer
    }
}

/// Registry of published parameter keys and their producers.
#[derive(Debug, Default, Clone)]
pub struct ParameterStore {
    entries: BTreeMap<ParameterKey, StackName>,
}

impl ParameterStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `producer` as the writer of `key`.
    ///
    /// Re-registering the same key for the same producer is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `ParameterConflict` if another stack already owns the key.
    pub fn publish(&mut self, key: &ParameterKey, producer: &StackName) -> Result<()> {
        match self.entries.get(key) {
            Some(owner) if owner == producer => {
                tracing::debug!(key = %key, producer = %producer, "parameter already registered");
                Ok(())
            }
            Some(owner) => Err(StackforgeError::ParameterConflict {
                key: key.to_string(),
                owner: owner.to_string(),
                requested_by: producer.to_string(),
            }),
            None => {
                tracing::debug!(key = %key, producer = %producer, "registering parameter");
                let _ = self.entries.insert(key.clone(), producer.clone());
                Ok(())
            }
        }
    }

    /// Returns the producer of `key` for a read by `consumer`.
    ///
    /// # Errors
    ///
    /// Returns `UnresolvedParameter` if no stack publishes the key, or if
    /// the registered producer differs from the one the handle names.
    pub fn resolve(&self, param: &ParameterRef, consumer: &StackName) -> Result<&StackName> {
        match self.entries.get(param.key()) {
            Some(owner) if owner == param.producer() => Ok(owner),
            _ => Err(StackforgeError::UnresolvedParameter {
                key: param.key().to_string(),
                stack: consumer.to_string(),
            }),
        }
    }

    /// Returns the producer of a key, if any.
    #[must_use]
    pub fn producer_of(&self, key: &ParameterKey) -> Option<&StackName> {
        self.entries.get(key)
    }

    /// Number of registered keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no keys are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over `(key, producer)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&ParameterKey, &StackName)> {
        self.entries.iter()
    }
}

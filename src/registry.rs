//! Document-type registry: named instruction templates, one per kind of
//! examination.
//!
//! The registry is an ordered list rather than a map. Display order is the
//! insertion order, and the persisted JSON object keeps that order so a
//! reload shows the types exactly as they were saved.
//!
//! Invariants held by every operation:
//! - at least one entry;
//! - names are unique and not blank;
//! - exactly one entry is *active* (the one a report is generated for when
//!   the caller does not name one).

use crate::error::RegistryError;
use crate::prompts::{DEFAULT_DOC_TYPES, DEFAULT_NEW_TEMPLATE};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use tracing::warn;

/// One kind of examination and the system prompt used for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentType {
    pub name: String,
    pub template: String,
}

/// Ordered, never-empty set of document types with an active selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentTypeRegistry {
    entries: Vec<DocumentType>,
    active: usize,
}

impl Default for DocumentTypeRegistry {
    /// The built-in cardiology document types.
    fn default() -> Self {
        Self {
            entries: DEFAULT_DOC_TYPES
                .iter()
                .map(|(name, template)| DocumentType {
                    name: (*name).to_string(),
                    template: (*template).to_string(),
                })
                .collect(),
            active: 0,
        }
    }
}

impl DocumentTypeRegistry {
    /// Build a registry from `(name, template)` pairs, keeping their order.
    ///
    /// Fails with [`RegistryError::LastEntry`] when `entries` is empty and
    /// [`RegistryError::DuplicateName`] on a repeated or blank name.
    /// The first entry becomes active.
    pub fn from_entries<I, N, T>(entries: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = (N, T)>,
        N: Into<String>,
        T: Into<String>,
    {
        let mut list: Vec<DocumentType> = Vec::new();
        for (name, template) in entries {
            let name = name.into();
            if !is_valid_name(&name) || list.iter().any(|d| d.name == name) {
                return Err(RegistryError::DuplicateName { name });
            }
            list.push(DocumentType {
                name,
                template: template.into(),
            });
        }
        if list.is_empty() {
            return Err(RegistryError::LastEntry {
                name: String::new(),
            });
        }
        Ok(Self {
            entries: list,
            active: 0,
        })
    }

    /// Add a new document type and make it the active one.
    ///
    /// An empty `template` is replaced by [`DEFAULT_NEW_TEMPLATE`].
    pub fn add(
        &mut self,
        name: impl Into<String>,
        template: impl Into<String>,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        if !is_valid_name(&name) || self.contains(&name) {
            return Err(RegistryError::DuplicateName { name });
        }
        let mut template = template.into();
        if template.is_empty() {
            template = DEFAULT_NEW_TEMPLATE.to_string();
        }
        self.entries.push(DocumentType { name, template });
        self.active = self.entries.len() - 1;
        Ok(())
    }

    /// Replace the template of an existing document type.
    pub fn update(&mut self, name: &str, template: impl Into<String>) -> Result<(), RegistryError> {
        let idx = self.position(name)?;
        self.entries[idx].template = template.into();
        Ok(())
    }

    /// Remove a document type.
    ///
    /// Removing the active entry re-selects the first remaining entry by
    /// insertion order. Removing an entry placed before the active one keeps
    /// the same entry active.
    pub fn remove(&mut self, name: &str) -> Result<DocumentType, RegistryError> {
        let idx = self.position(name)?;
        if self.entries.len() == 1 {
            return Err(RegistryError::LastEntry {
                name: name.to_string(),
            });
        }
        let removed = self.entries.remove(idx);
        if idx == self.active {
            self.active = 0;
        } else if idx < self.active {
            self.active -= 1;
        }
        Ok(removed)
    }

    /// Template for `name`.
    pub fn get(&self, name: &str) -> Result<&str, RegistryError> {
        let idx = self.position(name)?;
        Ok(&self.entries[idx].template)
    }

    /// Make `name` the active document type.
    pub fn select(&mut self, name: &str) -> Result<(), RegistryError> {
        self.active = self.position(name)?;
        Ok(())
    }

    /// The active document type.
    pub fn active(&self) -> &DocumentType {
        &self.entries[self.active]
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|d| d.name == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always `false`: the registry never drops below one entry.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Names in display order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|d| d.name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &DocumentType> {
        self.entries.iter()
    }

    fn position(&self, name: &str) -> Result<usize, RegistryError> {
        self.entries
            .iter()
            .position(|d| d.name == name)
            .ok_or_else(|| RegistryError::NotFound {
                name: name.to_string(),
            })
    }
}

fn is_valid_name(name: &str) -> bool {
    !name.trim().is_empty()
}

// ── Serde: JSON object `name → template`, order preserved ────────────────────

impl Serialize for DocumentTypeRegistry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for d in &self.entries {
            map.serialize_entry(&d.name, &d.template)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for DocumentTypeRegistry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(RegistryVisitor)
    }
}

struct RegistryVisitor;

impl<'de> Visitor<'de> for RegistryVisitor {
    type Value = DocumentTypeRegistry;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a non-empty map of document type names to templates")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut pairs: Vec<(String, String)> = Vec::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((name, value)) = access.next_entry::<String, serde_json::Value>()? {
            let template = match value {
                serde_json::Value::String(t) if is_valid_name(&name) => t,
                other => {
                    warn!("Skipping stored document type {:?}: invalid entry {}", name, other);
                    continue;
                }
            };
            // A repeated key keeps its first position and its last template.
            match pairs.iter_mut().find(|(n, _)| *n == name) {
                Some(slot) => slot.1 = template,
                None => pairs.push((name, template)),
            }
        }
        DocumentTypeRegistry::from_entries(pairs).map_err(serde::de::Error::custom)
    }
}

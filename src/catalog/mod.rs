//! Cask catalog: the ordered list of descriptors being resolved

pub mod descriptor;
pub mod source;

pub use descriptor::{Descriptor, Digest, Version};
pub use source::CatalogSource;

use crate::error::{CaskhashError, CaskhashResult};
use tracing::debug;

/// Descriptors in catalog order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    descriptors: Vec<Descriptor>,
}

impl Catalog {
    pub fn new(descriptors: Vec<Descriptor>) -> Self {
        Self { descriptors }
    }

    /// Load and parse a catalog, preserving source order
    pub async fn load(source: &CatalogSource) -> CaskhashResult<Self> {
        let content = source.read().await?;
        let catalog = Self::from_json(&source.to_string(), &content)?;
        debug!("Loaded {} casks from {}", catalog.len(), source);
        Ok(catalog)
    }

    /// Parse a JSON array of casks
    pub fn from_json(source_name: &str, content: &str) -> CaskhashResult<Self> {
        let descriptors: Vec<Descriptor> =
            serde_json::from_str(content).map_err(|e| CaskhashError::CatalogMalformed {
                source_name: source_name.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self { descriptors })
    }

    /// Serialize as a pretty JSON array with a trailing newline
    pub fn to_json_pretty(&self) -> CaskhashResult<String> {
        let mut json = serde_json::to_string_pretty(&self.descriptors)?;
        json.push('\n');
        Ok(json)
    }

    /// Descriptors whose digest is still unresolved, in catalog order
    pub fn pending(&self) -> impl Iterator<Item = &Descriptor> {
        self.descriptors.iter().filter(|d| d.needs_resolution())
    }

    /// Stable lexicographic sort by token
    pub fn sort_by_identifier(&mut self) {
        self.descriptors.sort_by(|a, b| a.identifier.cmp(&b.identifier));
    }

    pub fn iter(&self) -> impl Iterator<Item = &Descriptor> {
        self.descriptors.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Descriptor> {
        self.descriptors.iter_mut()
    }

    pub fn get(&self, identifier: &str) -> Option<&Descriptor> {
        self.descriptors.iter().find(|d| d.identifier == identifier)
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub fn into_descriptors(self) -> Vec<Descriptor> {
        self.descriptors
    }
}

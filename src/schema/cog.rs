//! Cog types and the immutable cog catalog.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a cog as it appears in the cog data table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CogId(pub u32);

impl fmt::Display for CogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single cog with its production attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cog {
    /// Identifier from the cog data table.
    pub id: CogId,
    /// Contribution to the build rate.
    pub build_rate: f64,
    /// Contribution to the flaggy rate.
    pub flaggy_rate: f64,
    /// Contribution to the experience multiplier.
    pub exp_mult: f64,
    /// Optional affix or shape tag.
    #[serde(default)]
    pub affix: Option<String>,
}

impl Cog {
    /// Create a cog without an affix.
    pub fn new(id: u32, build_rate: f64, flaggy_rate: f64, exp_mult: f64) -> Self {
        Self {
            id: CogId(id),
            build_rate,
            flaggy_rate,
            exp_mult,
            affix: None,
        }
    }

    /// Attach an affix tag.
    pub fn with_affix(mut self, affix: impl Into<String>) -> Self {
        self.affix = Some(affix.into());
        self
    }
}

/// Largest accepted magnitude of a cog attribute.
pub const MAX_ATTRIBUTE: f64 = 1e12;

/// Catalog construction errors.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Cog catalog is empty")]
    EmptyCatalog,
    #[error("Duplicate cog id {0}")]
    DuplicateCog(CogId),
    #[error("Slot set is empty")]
    EmptySlotSet,
    #[error("Cog {cog} has invalid {name} {value}")]
    InvalidAttribute {
        cog: CogId,
        name: &'static str,
        value: f64,
    },
}

/// Immutable collection of all cogs available to a run.
///
/// Cogs are addressed internally by their position in the catalog, which is
/// the order they were loaded in.
#[derive(Debug, Clone)]
pub struct CogCatalog {
    cogs: Vec<Cog>,
    index: BTreeMap<CogId, usize>,
}

impl CogCatalog {
    /// Build a catalog, rejecting empty input, duplicate ids and attributes
    /// that are not finite or exceed [`MAX_ATTRIBUTE`] in magnitude.
    pub fn new(cogs: Vec<Cog>) -> Result<Self, CatalogError> {
        if cogs.is_empty() {
            return Err(CatalogError::EmptyCatalog);
        }

        let mut index = BTreeMap::new();
        for (i, cog) in cogs.iter().enumerate() {
            if index.insert(cog.id, i).is_some() {
                return Err(CatalogError::DuplicateCog(cog.id));
            }
            for (name, value) in [
                ("build_rate", cog.build_rate),
                ("flaggy_rate", cog.flaggy_rate),
                ("exp_mult", cog.exp_mult),
            ] {
                if !value.is_finite() || value.abs() > MAX_ATTRIBUTE {
                    return Err(CatalogError::InvalidAttribute {
                        cog: cog.id,
                        name,
                        value,
                    });
                }
            }
        }

        Ok(Self { cogs, index })
    }

    /// Number of cogs.
    pub fn len(&self) -> usize {
        self.cogs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cogs.is_empty()
    }

    /// Cog at a catalog position.
    pub fn get(&self, idx: usize) -> Option<&Cog> {
        self.cogs.get(idx)
    }

    /// Catalog position of a cog id.
    pub fn position(&self, id: CogId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    /// Iterate cogs in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = &Cog> {
        self.cogs.iter()
    }
}

impl std::ops::Index<usize> for CogCatalog {
    type Output = Cog;

    fn index(&self, idx: usize) -> &Cog {
        &self.cogs[idx]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_lookup() {
        let catalog = CogCatalog::new(vec![
            Cog::new(7, 10.0, 0.0, 0.0),
            Cog::new(3, 0.0, 5.0, 0.0).with_affix("row"),
        ])
        .unwrap();

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.position(CogId(3)), Some(1));
        assert_eq!(catalog[1].affix.as_deref(), Some("row"));
        assert!(catalog.position(CogId(99)).is_none());
    }

    #[test]
    fn test_catalog_rejects_duplicates() {
        let result = CogCatalog::new(vec![Cog::new(1, 1.0, 0.0, 0.0), Cog::new(1, 2.0, 0.0, 0.0)]);
        assert!(matches!(result, Err(CatalogError::DuplicateCog(CogId(1)))));
    }

    #[test]
    fn test_catalog_rejects_invalid_attributes() {
        let result = CogCatalog::new(vec![Cog::new(4, f64::NAN, 0.0, 0.0)]);
        assert!(matches!(
            result,
            Err(CatalogError::InvalidAttribute { cog: CogId(4), name: "build_rate", .. })
        ));

        let result = CogCatalog::new(vec![Cog::new(5, 1.0, 0.0, -2.0 * MAX_ATTRIBUTE)]);
        assert!(matches!(
            result,
            Err(CatalogError::InvalidAttribute { name: "exp_mult", .. })
        ));
    }

    #[test]
    fn test_catalog_rejects_empty() {
        assert!(matches!(
            CogCatalog::new(Vec::new()),
            Err(CatalogError::EmptyCatalog)
        ));
    }
}

use std::{collections::BTreeMap, path::Path};

use anyhow::{Context, Result as AnyResult};
use serde::{Deserialize, Serialize};

use crate::compare::OwnershipMatcher;
use crate::error::{Error, Result};
use crate::geom::{Crs, ISRAEL_TM_GRID};

/// Names of the conventional attributes in the attribute table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldNames {
    pub key: String,
    pub land_use_type: String,
    pub ownership_label: String,
    pub ownership_percentage: String,
}

impl Default for FieldNames {
    fn default() -> Self {
        Self {
            key: "key".into(),
            land_use_type: "type".into(),
            ownership_label: "owner".into(),
            ownership_percentage: "ownership_pct".into(),
        }
    }
}

/// Land-use type label -> score weight per unit area. Unknown labels weigh 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeWeights(BTreeMap<String, f64>);

impl Default for TypeWeights {
    fn default() -> Self {
        Self::from_iter([("1", 10.0), ("2", 100.0), ("3", 5.0)])
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for TypeWeights {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(label, weight)| (label.into(), weight)).collect())
    }
}

impl TypeWeights {
    /// Weight of a type label; missing or unknown labels weigh 0.
    pub fn get(&self, label: Option<&str>) -> f64 {
        label.and_then(|label| self.0.get(label.trim())).copied().unwrap_or(0.0)
    }

    pub fn insert(&mut self, label: impl Into<String>, weight: f64) -> Option<f64> {
        self.0.insert(label.into(), weight)
    }

    pub fn validate(&self) -> Result<()> {
        match self.0.iter().find(|(_, weight)| !weight.is_finite() || **weight < 0.0) {
            Some((label, weight)) => Err(Error::InvalidConfig(
                format!("type weight for `{label}` must be finite and non-negative, got {weight}"),
            )),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComparisonConfig {
    /// Minimum ownership-scaled intersection area counted as a real overlap,
    /// in the squared linear unit of the working CRS.
    pub area_tolerance: f64,
    pub type_weights: TypeWeights,
    pub ownership: OwnershipMatcher,
}

impl Default for ComparisonConfig {
    fn default() -> Self {
        Self {
            area_tolerance: 0.25,
            type_weights: TypeWeights::default(),
            ownership: OwnershipMatcher::default(),
        }
    }
}

impl ComparisonConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.area_tolerance.is_finite() || self.area_tolerance < 0.0 {
            return Err(Error::InvalidConfig(
                format!("area_tolerance must be finite and non-negative, got {}", self.area_tolerance),
            ));
        }
        self.type_weights.validate()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilationConfig {
    /// Attribute deciding which of two overlapping polygons survives.
    pub precedence_field: String,
    /// Larger precedence values win when true, smaller ones otherwise.
    pub newest_first: bool,
    /// Overlaps up to this area (squared working-CRS unit) never erode.
    /// Boolean operations leave slivers of about 1e-7 between cut features.
    pub overlap_tolerance: f64,
}

impl Default for CompilationConfig {
    fn default() -> Self {
        Self { precedence_field: "last_update_date".into(), newest_first: true, overlap_tolerance: 1e-6 }
    }
}

impl CompilationConfig {
    pub fn new(precedence_field: impl Into<String>, newest_first: bool) -> Self {
        Self { precedence_field: precedence_field.into(), newest_first, ..Self::default() }
    }

    pub fn validate(&self) -> Result<()> {
        if self.precedence_field.trim().is_empty() {
            return Err(Error::InvalidConfig("precedence_field must not be empty".into()));
        }
        if !self.overlap_tolerance.is_finite() || self.overlap_tolerance < 0.0 {
            return Err(Error::InvalidConfig(
                format!("overlap_tolerance must be finite and non-negative, got {}", self.overlap_tolerance),
            ));
        }
        Ok(())
    }
}

/// Top-level configuration, passed explicitly to each entry point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// EPSG code of the CRS all areas are measured in.
    pub work_crs: u32,
    pub fields: FieldNames,
    pub comparison: ComparisonConfig,
    pub compilation: CompilationConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            work_crs: ISRAEL_TM_GRID,
            fields: FieldNames::default(),
            comparison: ComparisonConfig::default(),
            compilation: CompilationConfig::default(),
        }
    }
}

impl Config {
    /// Load a JSON config file. Missing keys take their defaults.
    pub fn from_json_file(path: &Path) -> AnyResult<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("[Config] Failed to read {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("[Config] Failed to parse {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        Crs::from_epsg(self.work_crs)?;
        if self.fields.key.trim().is_empty() {
            return Err(Error::InvalidConfig("fields.key must not be empty".into()));
        }
        self.comparison.validate()?;
        self.compilation.validate()
    }

    /// The working CRS as a resolved definition.
    pub fn work_crs(&self) -> Result<Crs> { Crs::from_epsg(self.work_crs) }
}

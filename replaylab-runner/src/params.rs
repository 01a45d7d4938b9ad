//! Parameter grids: ordered candidate lists per parameter name.

use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use std::fmt;

pub use replaylab_core::params::{ParamError, ParamSet, ParamSetExt, ParamValue};

/// Ordered mapping from parameter name to a non-empty candidate list.
///
/// Declaration order is kept: it drives Cartesian enumeration and the order
/// coordinate descent visits parameters in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamGrid {
    axes: Vec<(String, Vec<ParamValue>)>,
}

impl ParamGrid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a parameter. Rejects empty candidate lists and repeated names.
    pub fn push(
        &mut self,
        name: impl Into<String>,
        values: Vec<ParamValue>,
    ) -> Result<(), ParamError> {
        let name = name.into();
        if values.is_empty() {
            return Err(ParamError::EmptyCandidates { name });
        }
        if self.axes.iter().any(|(n, _)| *n == name) {
            return Err(ParamError::DuplicateName { name });
        }
        if let Some(v) = values.iter().find_map(|v| match v {
            ParamValue::Float(f) if !f.is_finite() => Some(*f),
            _ => None,
        }) {
            return Err(ParamError::NonFinite(v));
        }
        self.axes.push((name, values));
        Ok(())
    }

    pub fn with(
        mut self,
        name: impl Into<String>,
        values: impl IntoIterator<Item = ParamValue>,
    ) -> Result<Self, ParamError> {
        self.push(name, values.into_iter().collect())?;
        Ok(self)
    }

    pub fn from_axes(
        axes: impl IntoIterator<Item = (String, Vec<ParamValue>)>,
    ) -> Result<Self, ParamError> {
        let mut grid = Self::new();
        for (name, values) in axes {
            grid.push(name, values)?;
        }
        Ok(grid)
    }

    pub fn axes(&self) -> &[(String, Vec<ParamValue>)] {
        &self.axes
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.axes.iter().map(|(n, _)| n.as_str())
    }

    pub fn candidates(&self, name: &str) -> Option<&[ParamValue]> {
        self.axes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_slice())
    }

    pub fn len(&self) -> usize {
        self.axes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.axes.is_empty()
    }

    /// Number of full combinations.
    pub fn size(&self) -> usize {
        if self.axes.is_empty() {
            return 0;
        }
        self.axes.iter().map(|(_, v)| v.len()).product()
    }

    /// Every combination, last parameter varying fastest.
    pub fn combinations(&self) -> Vec<ParamSet> {
        if self.axes.is_empty() {
            return Vec::new();
        }
        let mut out = vec![ParamSet::new()];
        for (name, values) in &self.axes {
            out = out
                .into_iter()
                .flat_map(|partial| {
                    values.iter().map(move |v| {
                        let mut next = partial.clone();
                        next.insert(name.clone(), v.clone());
                        next
                    })
                })
                .collect();
        }
        out
    }

    /// Median candidate of every parameter: the element at `len / 2` after
    /// sorting with [`ParamValue::sort_cmp`].
    pub fn medians(&self) -> ParamSet {
        self.axes
            .iter()
            .map(|(name, values)| (name.clone(), median_value(values)))
            .collect()
    }
}

/// Element at `len / 2` of the sorted candidates. Times sort by clock.
///
/// Panics on an empty slice; grids never hold one.
pub fn median_value(values: &[ParamValue]) -> ParamValue {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.sort_cmp(b));
    sorted[sorted.len() / 2].clone()
}

// Deserialized from a TOML/JSON table, keeping the table's key order.
impl<'de> Deserialize<'de> for ParamGrid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct GridVisitor;

        impl<'de> Visitor<'de> for GridVisitor {
            type Value = ParamGrid;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a table of parameter name to candidate list")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<ParamGrid, A::Error> {
                let mut grid = ParamGrid::new();
                while let Some((name, values)) = map.next_entry::<String, Vec<ParamValue>>()? {
                    grid.push(name, values).map_err(de::Error::custom)?;
                }
                Ok(grid)
            }
        }

        deserializer.deserialize_map(GridVisitor)
    }
}

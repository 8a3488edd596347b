//! Restricted datatype value spaces

use crate::term::{Iri, Literal};
use crate::ReasonerError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Constraining facet kinds supported on numeric value spaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Facet {
    MinInclusive,
    MaxInclusive,
    MinExclusive,
    MaxExclusive,
}

impl fmt::Display for Facet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Facet::MinInclusive => "minInclusive",
            Facet::MaxInclusive => "maxInclusive",
            Facet::MinExclusive => "minExclusive",
            Facet::MaxExclusive => "maxExclusive",
        };
        write!(f, "{name}")
    }
}

/// One constraining facet applied to a value space.
///
/// The bound is kept as a literal; equality and hashing use the lexical
/// form, while the numeric value is parsed when the facet oracle runs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FacetRestriction {
    pub facet: Facet,
    pub value: Literal,
}

impl FacetRestriction {
    pub fn new(facet: Facet, value: Literal) -> Self {
        Self { facet, value }
    }

    /// Numeric bound of this restriction.
    pub fn bound(&self) -> Result<f64, ReasonerError> {
        let parsed: f64 = self.value.lexical.parse().map_err(|_| {
            ReasonerError::InvalidInput(format!(
                "constraining facet {} has non-numeric value '{}'",
                self.facet, self.value.lexical
            ))
        })?;
        if !parsed.is_finite() {
            return Err(ReasonerError::InvalidInput(format!(
                "constraining facet {} has non-finite value '{}'",
                self.facet, self.value.lexical
            )));
        }
        Ok(parsed)
    }
}

/// A datatype restricted by constraining facets, e.g.
/// `xsd:decimal[minInclusive 0, maxExclusive 10]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DataRange {
    pub datatype: Iri,
    pub facets: Vec<FacetRestriction>,
}

impl DataRange {
    pub fn new(datatype: impl Into<String>) -> Self {
        Self {
            datatype: Iri::new(datatype),
            facets: Vec::new(),
        }
    }

    pub fn with_facet(mut self, facet: Facet, value: Literal) -> Self {
        self.facets.push(FacetRestriction::new(facet, value));
        self
    }

    /// Reject malformed facet values up front, before any graph mutation.
    pub fn validate(&self) -> Result<(), ReasonerError> {
        for restriction in &self.facets {
            restriction.bound()?;
        }
        Ok(())
    }
}

impl fmt::Display for DataRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.datatype)?;
        if self.facets.is_empty() {
            return Ok(());
        }
        write!(f, "[")?;
        for (i, r) in self.facets.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{} {}", r.facet, r.value.lexical)?;
        }
        write!(f, "]")
    }
}

//! ABox assertions accepted by the engine

use crate::term::{Concept, Iri, Literal, Role};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single assertion about individuals, used to seed the completion graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Assertion {
    /// Concept membership: `individual : concept`
    Instance { individual: Iri, concept: Concept },

    /// Object role assertion: `subject role object`
    Related {
        subject: Iri,
        role: Role,
        object: Iri,
    },

    /// Data role assertion: `subject role "value"`
    ValueRelated {
        subject: Iri,
        role: Role,
        value: Literal,
    },

    /// Equality between two individuals
    SameAs { first: Iri, second: Iri },

    /// Inequality between two individuals
    DifferentFrom { first: Iri, second: Iri },
}

impl Assertion {
    pub fn instance(individual: impl Into<String>, concept: Concept) -> Self {
        Assertion::Instance {
            individual: Iri::new(individual),
            concept,
        }
    }

    pub fn related(subject: impl Into<String>, role: Role, object: impl Into<String>) -> Self {
        Assertion::Related {
            subject: Iri::new(subject),
            role,
            object: Iri::new(object),
        }
    }
}

impl fmt::Display for Assertion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Assertion::Instance {
                individual,
                concept,
            } => write!(f, "{individual} : {concept}"),
            Assertion::Related {
                subject,
                role,
                object,
            } => write!(f, "{subject} {role} {object}"),
            Assertion::ValueRelated {
                subject,
                role,
                value,
            } => write!(f, "{subject} {role} {value}"),
            Assertion::SameAs { first, second } => write!(f, "{first} = {second}"),
            Assertion::DifferentFrom { first, second } => write!(f, "{first} ≠ {second}"),
        }
    }
}

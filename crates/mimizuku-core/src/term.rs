//! Concept and role terms

use crate::datarange::DataRange;
use serde::{Deserialize, Serialize};
use std::fmt;

/// IRI identifying a named concept, role, individual or datatype
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Iri(pub String);

impl Iri {
    pub fn new(iri: impl Into<String>) -> Self {
        Iri(iri.into())
    }
}

impl fmt::Display for Iri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Iri {
    fn from(iri: &str) -> Self {
        Iri(iri.to_string())
    }
}

/// Role (property) term
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Object role between two individuals
    Object(Iri),

    /// Data role from an individual to a literal value
    Data(Iri),
}

impl Role {
    pub fn iri(&self) -> &Iri {
        match self {
            Role::Object(iri) | Role::Data(iri) => iri,
        }
    }

    pub fn is_data(&self) -> bool {
        matches!(self, Role::Data(_))
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.iri())
    }
}

/// Typed literal value
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Literal {
    /// Lexical form, e.g. `"42"`
    pub lexical: String,

    /// Datatype IRI, e.g. `xsd:decimal`
    pub datatype: Iri,
}

impl Literal {
    pub fn new(lexical: impl Into<String>, datatype: impl Into<String>) -> Self {
        Self {
            lexical: lexical.into(),
            datatype: Iri::new(datatype),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"^^{}", self.lexical, self.datatype)
    }
}

/// Concept expression
///
/// Internally the engine keeps every concept in negation normal form:
/// `Not` only ever wraps a `Named`, `OneOf` or `ValueSpace` atom after
/// [`Concept::nnf`] has run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Concept {
    /// ⊤
    Thing,

    /// ⊥
    Nothing,

    /// Named concept
    Named(Iri),

    /// Complement: ¬C
    Not(Box<Concept>),

    /// Conjunction: C1 ⊓ C2 ⊓ ... ⊓ Cn
    And(Vec<Concept>),

    /// Disjunction: C1 ⊔ C2 ⊔ ... ⊔ Cn
    Or(Vec<Concept>),

    /// Existential restriction: ∃R.C
    Some { role: Role, filler: Box<Concept> },

    /// Universal restriction: ∀R.C
    All { role: Role, filler: Box<Concept> },

    /// Minimum cardinality: ≥n R.C (`None` filler means ⊤)
    AtLeast {
        n: u32,
        role: Role,
        filler: Option<Box<Concept>>,
    },

    /// Maximum cardinality: ≤n R.C (`None` filler means ⊤)
    AtMost {
        n: u32,
        role: Role,
        filler: Option<Box<Concept>>,
    },

    /// Enumeration of individuals: {i1, ..., in}
    OneOf(Vec<Iri>),

    /// Restricted datatype value space
    ValueSpace(DataRange),
}

impl Concept {
    pub fn named(iri: impl Into<String>) -> Self {
        Concept::Named(Iri::new(iri))
    }

    pub fn not(concept: Concept) -> Self {
        Concept::Not(Box::new(concept))
    }

    pub fn some(role: Role, filler: Concept) -> Self {
        Concept::Some {
            role,
            filler: Box::new(filler),
        }
    }

    pub fn all(role: Role, filler: Concept) -> Self {
        Concept::All {
            role,
            filler: Box::new(filler),
        }
    }

    /// Rewrite into negation normal form, pushing complements down to atoms.
    pub fn nnf(&self) -> Concept {
        match self {
            Concept::Not(inner) => inner.nnf().negated(),
            Concept::And(cs) => Concept::And(cs.iter().map(Concept::nnf).collect()),
            Concept::Or(cs) => Concept::Or(cs.iter().map(Concept::nnf).collect()),
            Concept::Some { role, filler } => Concept::Some {
                role: role.clone(),
                filler: Box::new(filler.nnf()),
            },
            Concept::All { role, filler } => Concept::All {
                role: role.clone(),
                filler: Box::new(filler.nnf()),
            },
            Concept::AtLeast { n, role, filler } => Concept::AtLeast {
                n: *n,
                role: role.clone(),
                filler: filler.as_ref().map(|f| Box::new(f.nnf())),
            },
            Concept::AtMost { n, role, filler } => Concept::AtMost {
                n: *n,
                role: role.clone(),
                filler: filler.as_ref().map(|f| Box::new(f.nnf())),
            },
            _ => self.clone(),
        }
    }

    /// NNF negation. Assumes `self` is already in NNF and produces NNF.
    ///
    /// Structural clash detection relies on this being deterministic:
    /// a node labelled with both `c` and `c.negated()` is contradictory.
    pub fn negated(&self) -> Concept {
        match self {
            Concept::Thing => Concept::Nothing,
            Concept::Nothing => Concept::Thing,
            Concept::Not(inner) => (**inner).clone(),
            Concept::Named(_) | Concept::OneOf(_) | Concept::ValueSpace(_) => {
                Concept::Not(Box::new(self.clone()))
            }
            Concept::And(cs) => Concept::Or(cs.iter().map(Concept::negated).collect()),
            Concept::Or(cs) => Concept::And(cs.iter().map(Concept::negated).collect()),
            Concept::Some { role, filler } => Concept::All {
                role: role.clone(),
                filler: Box::new(filler.negated()),
            },
            Concept::All { role, filler } => Concept::Some {
                role: role.clone(),
                filler: Box::new(filler.negated()),
            },
            // ¬(≥0 R) is unsatisfiable, otherwise ¬(≥n R) = ≤n-1 R
            Concept::AtLeast { n: 0, .. } => Concept::Nothing,
            Concept::AtLeast { n, role, filler } => Concept::AtMost {
                n: n - 1,
                role: role.clone(),
                filler: filler.clone(),
            },
            Concept::AtMost { n, role, filler } => Concept::AtLeast {
                n: n + 1,
                role: role.clone(),
                filler: filler.clone(),
            },
        }
    }
}

impl fmt::Display for Concept {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Concept::Thing => write!(f, "⊤"),
            Concept::Nothing => write!(f, "⊥"),
            Concept::Named(iri) => write!(f, "{iri}"),
            Concept::Not(c) => write!(f, "¬{c}"),
            Concept::And(cs) => {
                write!(f, "(")?;
                for (i, c) in cs.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ⊓ ")?;
                    }
                    write!(f, "{c}")?;
                }
                write!(f, ")")
            }
            Concept::Or(cs) => {
                write!(f, "(")?;
                for (i, c) in cs.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ⊔ ")?;
                    }
                    write!(f, "{c}")?;
                }
                write!(f, ")")
            }
            Concept::Some { role, filler } => write!(f, "∃{role}.{filler}"),
            Concept::All { role, filler } => write!(f, "∀{role}.{filler}"),
            Concept::AtLeast { n, role, filler } => match filler {
                Some(c) => write!(f, "≥{n} {role}.{c}"),
                None => write!(f, "≥{n} {role}"),
            },
            Concept::AtMost { n, role, filler } => match filler {
                Some(c) => write!(f, "≤{n} {role}.{c}"),
                None => write!(f, "≤{n} {role}"),
            },
            Concept::OneOf(is) => {
                write!(f, "{{")?;
                for (i, ind) in is.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{ind}")?;
                }
                write!(f, "}}")
            }
            Concept::ValueSpace(range) => write!(f, "{range}"),
        }
    }
}

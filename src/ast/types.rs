//! Abstract (store-independent) type model of the command tree.

use serde::{Deserialize, Serialize};

/// Primitive kinds the host metadata system knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrimitiveKind {
    Boolean,
    Byte,
    SByte,
    Int16,
    Int32,
    Int64,
    Single,
    Double,
    Decimal,
    String,
    Binary,
    Guid,
    DateTime,
    DateTimeOffset,
    Time,
}

impl std::fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Type facets carried alongside an abstract type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Facets {
    pub max_length: Option<u32>,
    pub precision: Option<u8>,
    pub scale: Option<u8>,
    pub fixed_length: Option<bool>,
    pub identity: bool,
}

/// A named, typed member of a row type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Member {
    pub name: String,
    pub ty: TypeUsage,
}

impl Member {
    pub fn new(name: impl Into<String>, ty: TypeUsage) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdmType {
    Primitive(PrimitiveKind),
    Row(Vec<Member>),
    Collection(Box<TypeUsage>),
}

/// An abstract type plus its facets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeUsage {
    pub edm: EdmType,
    #[serde(default)]
    pub facets: Facets,
}

impl TypeUsage {
    pub fn primitive(kind: PrimitiveKind) -> Self {
        Self {
            edm: EdmType::Primitive(kind),
            facets: Facets::default(),
        }
    }

    pub fn row(members: Vec<Member>) -> Self {
        Self {
            edm: EdmType::Row(members),
            facets: Facets::default(),
        }
    }

    pub fn collection(element: TypeUsage) -> Self {
        Self {
            edm: EdmType::Collection(Box::new(element)),
            facets: Facets::default(),
        }
    }

    pub fn boolean() -> Self {
        Self::primitive(PrimitiveKind::Boolean)
    }

    pub fn string() -> Self {
        Self::primitive(PrimitiveKind::String)
    }

    pub fn with_facets(mut self, facets: Facets) -> Self {
        self.facets = facets;
        self
    }

    pub fn primitive_kind(&self) -> Option<PrimitiveKind> {
        match self.edm {
            EdmType::Primitive(kind) => Some(kind),
            _ => None,
        }
    }

    pub fn element_type(&self) -> Option<&TypeUsage> {
        match &self.edm {
            EdmType::Collection(element) => Some(element),
            _ => None,
        }
    }

    /// Members of a row type, or of the row element of a collection.
    pub fn members(&self) -> Option<&[Member]> {
        match &self.edm {
            EdmType::Row(members) => Some(members),
            EdmType::Collection(element) => element.members(),
            EdmType::Primitive(_) => None,
        }
    }

    /// Type identity with facets ignored.
    pub fn same_type(&self, other: &TypeUsage) -> bool {
        self.edm == other.edm
    }
}

impl From<PrimitiveKind> for TypeUsage {
    fn from(kind: PrimitiveKind) -> Self {
        Self::primitive(kind)
    }
}

//! Mapping between abstract types and PostgreSQL store types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::parse;
use crate::ast::{Facets, PrimitiveKind, TypeUsage};
use crate::error::{XlateError, XlateResult};

/// Precision/scale used when a numeric carries only one of the two facets.
pub const DEFAULT_DECIMAL_PRECISION: u8 = 19;
pub const DEFAULT_DECIMAL_SCALE: u8 = 4;

/// A PostgreSQL type name with the facets that appear in its declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoreType {
    pub name: String,
    pub facets: Facets,
}

impl StoreType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            facets: Facets::default(),
        }
    }

    fn with_max_length(mut self, max_length: Option<u32>) -> Self {
        self.facets.max_length = max_length;
        self
    }

    fn with_precision(mut self, precision: Option<u8>) -> Self {
        self.facets.precision = precision;
        self
    }

    /// Parse a declaration such as `varchar(20)` or `double precision`,
    /// normalizing aliases to canonical names.
    pub fn parse(input: &str) -> XlateResult<Self> {
        let (name, args) = parse::store_type_name(input)?;
        let arg = |i: usize| args.get(i).copied();
        let small = |i: usize| -> XlateResult<Option<u8>> {
            arg(i)
                .map(|v| u8::try_from(v).map_err(|_| XlateError::parse(0, format!("type argument {} out of range", v))))
                .transpose()
        };

        let canonical = match name.as_str() {
            "bool" | "boolean" => "bool",
            "int2" | "smallint" => "int2",
            "int4" | "int" | "integer" => "int4",
            "int8" | "bigint" => "int8",
            "serial2" | "smallserial" => "serial2",
            "serial4" | "serial" => "serial4",
            "serial8" | "bigserial" => "serial8",
            "float4" | "real" => "float4",
            "float8" | "double precision" => "float8",
            "numeric" | "decimal" => "numeric",
            "text" => "text",
            "varchar" | "character varying" => "varchar",
            "bpchar" | "char" | "character" => "bpchar",
            "xml" => "xml",
            "bytea" => "bytea",
            "uuid" => "uuid",
            "date" => "date",
            "time" | "time without time zone" => "time",
            "timestamp" | "timestamp without time zone" => "timestamp",
            "timestamptz" | "timestamp with time zone" => "timestamptz",
            "interval" => "interval",
            "rowversion" => "rowversion",
            other => return Err(XlateError::UnsupportedType(other.to_string())),
        };

        let store = StoreType::new(canonical);
        Ok(match canonical {
            "numeric" => StoreType {
                facets: Facets {
                    precision: small(0)?,
                    scale: small(1)?,
                    ..Facets::default()
                },
                ..store
            },
            "varchar" | "bpchar" => store.with_max_length(arg(0)),
            "timestamp" | "timestamptz" | "interval" => store.with_precision(small(0)?),
            _ => store,
        })
    }

    /// Accept any syntactically valid type name, known or not, for use in a
    /// cast target. The name is returned trimmed and otherwise untouched.
    pub fn check_name(input: &str) -> XlateResult<String> {
        parse::store_type_name(input)?;
        Ok(input.trim().to_string())
    }
}

impl FromStr for StoreType {
    type Err = XlateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StoreType::parse(s)
    }
}

impl fmt::Display for StoreType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        match (self.name.as_str(), &self.facets) {
            ("numeric", Facets { precision: Some(p), scale: Some(s), .. }) => write!(f, "({},{})", p, s),
            ("varchar" | "bpchar", Facets { max_length: Some(n), .. }) => write!(f, "({})", n),
            ("timestamp" | "timestamptz" | "interval", Facets { precision: Some(p), .. }) => {
                write!(f, "({})", p)
            }
            _ => Ok(()),
        }
    }
}

/// Store type for an abstract type.
pub fn store_type(ty: &TypeUsage) -> XlateResult<StoreType> {
    let kind = ty
        .primitive_kind()
        .ok_or_else(|| XlateError::UnsupportedType(format!("{:?}", ty.edm)))?;
    let facets = &ty.facets;

    let store = match kind {
        PrimitiveKind::Boolean => StoreType::new("bool"),
        PrimitiveKind::Byte | PrimitiveKind::SByte | PrimitiveKind::Int16 => {
            StoreType::new(if facets.identity { "serial2" } else { "int2" })
        }
        PrimitiveKind::Int32 => StoreType::new(if facets.identity { "serial4" } else { "int4" }),
        PrimitiveKind::Int64 => StoreType::new(if facets.identity { "serial8" } else { "int8" }),
        PrimitiveKind::Single => StoreType::new("float4"),
        PrimitiveKind::Double => StoreType::new("float8"),
        PrimitiveKind::Decimal => {
            let mut store = StoreType::new("numeric");
            match (facets.precision, facets.scale) {
                (None, None) => {}
                (p, s) => {
                    store.facets.precision = Some(p.unwrap_or(DEFAULT_DECIMAL_PRECISION));
                    store.facets.scale = Some(s.unwrap_or(DEFAULT_DECIMAL_SCALE));
                }
            }
            store
        }
        PrimitiveKind::String => {
            if facets.fixed_length == Some(true) {
                StoreType::new("bpchar").with_max_length(facets.max_length)
            } else if facets.max_length.is_some() {
                StoreType::new("varchar").with_max_length(facets.max_length)
            } else {
                StoreType::new("text")
            }
        }
        PrimitiveKind::Binary => StoreType::new("bytea"),
        PrimitiveKind::Guid => StoreType::new("uuid"),
        PrimitiveKind::DateTime => StoreType::new("timestamp").with_precision(facets.precision),
        PrimitiveKind::DateTimeOffset => {
            StoreType::new("timestamptz").with_precision(facets.precision)
        }
        PrimitiveKind::Time => StoreType::new("interval").with_precision(facets.precision),
    };
    Ok(store)
}

/// Abstract type for a store type.
pub fn edm_type(store: &StoreType) -> XlateResult<TypeUsage> {
    let sf = &store.facets;
    let (kind, facets) = match store.name.as_str() {
        "bool" => (PrimitiveKind::Boolean, Facets::default()),
        "int2" => (PrimitiveKind::Int16, Facets::default()),
        "int4" => (PrimitiveKind::Int32, Facets::default()),
        "int8" => (PrimitiveKind::Int64, Facets::default()),
        "serial2" => (PrimitiveKind::Int16, identity()),
        "serial4" => (PrimitiveKind::Int32, identity()),
        "serial8" => (PrimitiveKind::Int64, identity()),
        "float4" => (PrimitiveKind::Single, Facets::default()),
        "float8" => (PrimitiveKind::Double, Facets::default()),
        "uuid" => (PrimitiveKind::Guid, Facets::default()),
        "numeric" => (
            PrimitiveKind::Decimal,
            Facets {
                precision: sf.precision,
                scale: sf.scale,
                ..Facets::default()
            },
        ),
        "bpchar" => (PrimitiveKind::String, string_facets(true, sf.max_length)),
        "varchar" => (PrimitiveKind::String, string_facets(false, sf.max_length)),
        "text" | "xml" => (PrimitiveKind::String, string_facets(false, None)),
        "timestamp" => (PrimitiveKind::DateTime, precision(sf.precision)),
        "date" => (PrimitiveKind::DateTime, precision(Some(0))),
        "timestamptz" => (PrimitiveKind::DateTimeOffset, precision(sf.precision)),
        "time" | "interval" => (PrimitiveKind::Time, precision(sf.precision)),
        "bytea" => (
            PrimitiveKind::Binary,
            Facets {
                fixed_length: Some(false),
                max_length: sf.max_length,
                ..Facets::default()
            },
        ),
        "rowversion" => (
            PrimitiveKind::Binary,
            Facets {
                fixed_length: Some(true),
                max_length: Some(8),
                ..Facets::default()
            },
        ),
        other => return Err(XlateError::UnsupportedType(other.to_string())),
    };
    Ok(TypeUsage::primitive(kind).with_facets(facets))
}

fn identity() -> Facets {
    Facets {
        identity: true,
        ..Facets::default()
    }
}

fn precision(precision: Option<u8>) -> Facets {
    Facets {
        precision,
        ..Facets::default()
    }
}

fn string_facets(fixed: bool, max_length: Option<u32>) -> Facets {
    Facets {
        fixed_length: Some(fixed),
        max_length,
        ..Facets::default()
    }
}

/// Type name used in `CAST(... AS <name>)`; facets are not rendered.
pub fn db_type_name(ty: &TypeUsage) -> XlateResult<&'static str> {
    let kind = ty.primitive_kind().ok_or_else(|| {
        XlateError::unsupported(format!("cast to non-primitive type {:?}", ty.edm))
    })?;
    Ok(match kind {
        PrimitiveKind::Boolean => "bool",
        PrimitiveKind::Byte | PrimitiveKind::SByte | PrimitiveKind::Int16 => "int2",
        PrimitiveKind::Int32 => "int4",
        PrimitiveKind::Int64 => "int8",
        PrimitiveKind::String => "text",
        PrimitiveKind::Decimal => "numeric",
        PrimitiveKind::Single => "float4",
        PrimitiveKind::Double => "float8",
        PrimitiveKind::DateTime => "timestamp",
        PrimitiveKind::DateTimeOffset => "timestamptz",
        PrimitiveKind::Time => "interval",
        PrimitiveKind::Binary => "bytea",
        PrimitiveKind::Guid => "uuid",
    })
}

/// Wire type tag attached to a bound parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParameterType {
    Bytea,
    Boolean,
    Smallint,
    Integer,
    Bigint,
    Real,
    Double,
    Numeric,
    Timestamp,
    TimestampTz,
    Interval,
    Uuid,
    /// Left for the server to infer; strings travel this way so they
    /// coerce to text, varchar or bpchar as the context demands.
    Unknown,
}

pub fn parameter_type(kind: PrimitiveKind) -> ParameterType {
    match kind {
        PrimitiveKind::Binary => ParameterType::Bytea,
        PrimitiveKind::Boolean => ParameterType::Boolean,
        PrimitiveKind::Byte | PrimitiveKind::SByte | PrimitiveKind::Int16 => {
            ParameterType::Smallint
        }
        PrimitiveKind::Int32 => ParameterType::Integer,
        PrimitiveKind::Int64 => ParameterType::Bigint,
        PrimitiveKind::Single => ParameterType::Real,
        PrimitiveKind::Double => ParameterType::Double,
        PrimitiveKind::Decimal => ParameterType::Numeric,
        PrimitiveKind::DateTime => ParameterType::Timestamp,
        PrimitiveKind::DateTimeOffset => ParameterType::TimestampTz,
        PrimitiveKind::Time => ParameterType::Interval,
        PrimitiveKind::Guid => ParameterType::Uuid,
        PrimitiveKind::String => ParameterType::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn string(fixed: Option<bool>, max_length: Option<u32>) -> TypeUsage {
        TypeUsage::string().with_facets(Facets {
            fixed_length: fixed,
            max_length,
            ..Facets::default()
        })
    }

    #[test]
    fn test_string_store_types() {
        assert_eq!(store_type(&string(None, None)).unwrap().to_string(), "text");
        assert_eq!(store_type(&string(Some(false), Some(20))).unwrap().to_string(), "varchar(20)");
        assert_eq!(store_type(&string(Some(true), Some(3))).unwrap().to_string(), "bpchar(3)");
    }

    #[test]
    fn test_numeric_defaults_missing_facet() {
        let ty = TypeUsage::primitive(PrimitiveKind::Decimal).with_facets(Facets {
            precision: Some(10),
            ..Facets::default()
        });
        assert_eq!(store_type(&ty).unwrap().to_string(), "numeric(10,4)");
        let bare = TypeUsage::primitive(PrimitiveKind::Decimal);
        assert_eq!(store_type(&bare).unwrap().to_string(), "numeric");
    }

    #[test]
    fn test_identity_integers_become_serial() {
        let ty = TypeUsage::primitive(PrimitiveKind::Int64).with_facets(Facets {
            identity: true,
            ..Facets::default()
        });
        assert_eq!(store_type(&ty).unwrap().name, "serial8");
        assert_eq!(edm_type(&StoreType::new("serial8")).unwrap(), ty);
    }

    #[test]
    fn test_store_names_round_trip() {
        for decl in [
            "bool",
            "int2",
            "int4",
            "int8",
            "serial4",
            "float4",
            "float8",
            "numeric",
            "numeric(10,2)",
            "text",
            "varchar(40)",
            "bpchar",
            "bpchar(8)",
            "bytea",
            "uuid",
            "timestamp",
            "timestamp(3)",
            "timestamptz",
            "timestamptz(6)",
            "interval",
            "interval(2)",
        ] {
            let store = StoreType::parse(decl).unwrap();
            let back = store_type(&edm_type(&store).unwrap()).unwrap();
            assert_eq!(back, store, "{}", decl);
            assert_eq!(back.to_string(), decl);
        }
    }

    #[test]
    fn test_narrow_integers_share_int2() {
        for kind in [PrimitiveKind::Byte, PrimitiveKind::SByte, PrimitiveKind::Int16] {
            assert_eq!(store_type(&kind.into()).unwrap().name, "int2");
        }
        assert_eq!(
            edm_type(&StoreType::new("int2")).unwrap().primitive_kind(),
            Some(PrimitiveKind::Int16)
        );
    }

    #[test]
    fn test_inverse_only_names() {
        let date = edm_type(&StoreType::parse("date").unwrap()).unwrap();
        assert_eq!(date.primitive_kind(), Some(PrimitiveKind::DateTime));
        assert_eq!(date.facets.precision, Some(0));
        let xml = edm_type(&StoreType::parse("xml").unwrap()).unwrap();
        assert_eq!(xml.primitive_kind(), Some(PrimitiveKind::String));
        assert!(matches!(
            edm_type(&StoreType::new("geometry")),
            Err(XlateError::UnsupportedType(_))
        ));
    }

    #[test]
    fn test_aliases_normalize() {
        assert_eq!(StoreType::parse("character varying(20)").unwrap().to_string(), "varchar(20)");
        assert_eq!(StoreType::parse("double precision").unwrap().name, "float8");
        assert_eq!(
            StoreType::parse("timestamp(3) with time zone").unwrap().to_string(),
            "timestamptz(3)"
        );
    }

    #[test]
    fn test_strings_travel_untyped() {
        assert_eq!(parameter_type(PrimitiveKind::String), ParameterType::Unknown);
        assert_eq!(parameter_type(PrimitiveKind::Byte), ParameterType::Smallint);
    }

    #[test]
    fn test_check_name_accepts_unknown_types() {
        assert_eq!(StoreType::check_name(" tsvector ").unwrap(), "tsvector");
        assert!(StoreType::check_name("int4); DROP TABLE x; --").is_err());
    }
}

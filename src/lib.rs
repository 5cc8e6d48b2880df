//! # pgxlate
//!
//! Translates relational command trees (the query and DML trees an
//! object-relational mapper builds) into PostgreSQL SQL plus bound
//! parameters.
//!
//! ## Quick Example
//!
//! ```
//! use pgxlate::prelude::*;
//! use pgxlate::ast::builders::*;
//!
//! let blogs = scan("dbo", "Blogs")
//!     .with_column("Name", PrimitiveKind::String)
//!     .with_column("Rating", PrimitiveKind::Int32);
//! let input = blogs.bind("Extent1");
//! let rating = input.var_ref().prop("Rating");
//! let name = input.var_ref().prop("Name");
//! let query = project(filter(input, gt(rating, constant(3))).bind("Filter1"), vec![("Name", name)]);
//!
//! let command = translate(&CommandTree::query(query), &TranslatorConfig::default()).unwrap();
//! assert_eq!(
//!     command.text,
//!     "SELECT \"Extent1\".\"Name\" FROM \"dbo\".\"Blogs\" AS \"Extent1\" WHERE \"Extent1\".\"Rating\" > 3"
//! );
//! ```
//!
//! ## Layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`ast`] | Input command trees and their type model |
//! | [`sql`] | Output SQL tree, select stages, operator precedence |
//! | [`transpiler`] | Tree walk, subquery decisions, command builders |
//! | [`dialect`] | Type mapping, literals, server version |
//! | [`config`] | `pgxlate.toml` loading |

pub mod ast;
pub mod config;
pub mod dialect;
pub mod error;
pub mod sql;
pub mod transpiler;

pub use config::TranslatorConfig;
pub use error::{XlateError, XlateResult};
pub use transpiler::{Command, Parameter, ResultColumn, translate};

pub mod prelude {
    pub use crate::ast::*;
    pub use crate::config::TranslatorConfig;
    pub use crate::dialect::{ParameterType, ServerVersion, StoreType};
    pub use crate::error::*;
    pub use crate::transpiler::{Command, Parameter, ResultColumn, translate};
}

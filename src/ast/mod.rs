//! Command-tree data model: the relational-algebra input of the translator.

pub mod builders;
pub mod cmd;
pub mod expr;
pub mod types;
pub mod values;

pub use cmd::*;
pub use expr::*;
pub use types::*;
pub use values::*;

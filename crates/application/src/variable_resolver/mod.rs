//! Variable resolution module
//!
//! Parses `$name`, `[[name:format]]` and `${name.path:format}` references and
//! substitutes them with formatted variable values.
//!
//! # Usage
//!
//! ```
//! use indexmap::IndexMap;
//! use stencil_application::variable_resolver::{BuiltinVariables, FieldPathCache, Interpolator};
//! use stencil_domain::{ConstantVariable, EngineSettings, VariableKind, VariableModel, VariableOption};
//!
//! let host = VariableModel::new(
//!     "host",
//!     VariableKind::Constant(ConstantVariable { query: "localhost".to_string() }),
//! )
//! .with_current(VariableOption::same("localhost"));
//! let mut variables = IndexMap::new();
//! variables.insert(host.id.clone(), host);
//!
//! let builtins = BuiltinVariables::new();
//! let settings = EngineSettings::default();
//! let cache = FieldPathCache::new();
//! let engine = Interpolator::new(&variables, &builtins, &settings, &cache);
//!
//! assert_eq!(engine.replace(Some("http://$host/api"), None, None), "http://localhost/api");
//! ```

pub mod builtins;
pub mod engine;
pub mod field_path;
pub mod formats;
pub mod parser;

pub use builtins::{BUILTIN_NAMES, BuiltinVariables, DashboardInfo};
pub use engine::{FormatFn, Interpolator, ReplaceFormat};
pub use field_path::{FieldPath, FieldPathCache};
pub use formats::{FormatId, FormatInput, FormatSpec, UnknownFormat, format_value};
pub use parser::{
    ReferenceSyntax, VARIABLE_REGEX, VariableReference, contains_variable,
    extract_variable_names, get_variable_name, has_references, parse_references,
};

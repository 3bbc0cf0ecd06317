//! Template variable types.
//!
//! A variable is a [`VariableModel`]: common fields plus a [`VariableKind`] carrying
//! kind-specific settings. The persisted form is [`PersistedVariable`].

mod filter;
mod kind;
mod model;
mod sort;
mod value;

pub use filter::AdHocFilter;
pub use kind::{
    AdHocVariable, ConstantVariable, CustomVariable, DataSourceRef, DataSourceVariable,
    IntervalVariable, LoadingState, QueryVariable, SelectionOptions, SystemVariable,
    TextBoxVariable, VariableHide, VariableKind, VariableRefresh, VariableSort, VariableType,
};
pub use model::{PersistedVariable, VariableIdentifier, VariableModel};
pub use sort::sort_variable_values;
pub use value::{
    ALL_VARIABLE_TEXT, ALL_VARIABLE_VALUE, AUTO_INTERVAL_PREFIX, NONE_VARIABLE_TEXT,
    NONE_VARIABLE_VALUE, VariableOption, VariableValue,
};

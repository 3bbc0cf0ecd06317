//! Constant variables: a single hidden value.

use async_trait::async_trait;
use stencil_domain::{VariableKind, VariableModel, VariableOption, VariableType};

use super::{OptionsUpdate, SelectionPolicy, UpdateContext, VariableAdapter};
use crate::error::{ApplicationError, ApplicationResult};

/// Adapter for `constant` variables.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConstantVariableAdapter;

#[async_trait]
impl VariableAdapter for ConstantVariableAdapter {
    fn variable_type(&self) -> VariableType {
        VariableType::Constant
    }

    fn name(&self) -> &'static str {
        "Constant"
    }

    fn description(&self) -> &'static str {
        "Define a hidden constant variable, useful for metric prefixes in dashboards you want to share"
    }

    async fn update_options(
        &self,
        variable: &VariableModel,
        _ctx: &UpdateContext,
    ) -> ApplicationResult<OptionsUpdate> {
        let VariableKind::Constant(constant) = &variable.kind else {
            return Err(ApplicationError::Unsupported {
                kind: variable.variable_type().as_str(),
                operation: "constant options",
            });
        };
        Ok(OptionsUpdate {
            options: vec![VariableOption::same(constant.query.trim())],
            selection: SelectionPolicy::First,
            auto_interval: None,
        })
    }
}

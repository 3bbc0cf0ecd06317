//! System variables carry a structured built-in value and never refresh.

use async_trait::async_trait;
use stencil_domain::{VariableModel, VariableType};

use super::{OptionsUpdate, SelectionPolicy, UpdateContext, VariableAdapter};
use crate::error::ApplicationResult;

/// Adapter for `system` variables.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemVariableAdapter;

#[async_trait]
impl VariableAdapter for SystemVariableAdapter {
    fn variable_type(&self) -> VariableType {
        VariableType::System
    }

    fn name(&self) -> &'static str {
        "system"
    }

    fn description(&self) -> &'static str {
        ""
    }

    async fn update_options(
        &self,
        variable: &VariableModel,
        _ctx: &UpdateContext,
    ) -> ApplicationResult<OptionsUpdate> {
        Ok(OptionsUpdate {
            options: variable.options.clone(),
            selection: SelectionPolicy::Keep,
            auto_interval: None,
        })
    }
}

//! Interpolation engine
//!
//! Substitutes variable references in a string against a read-only snapshot of
//! the registry. Resolution of each reference:
//!
//! 1. a binding in the scoped variables wins;
//! 2. otherwise the registry variable's current value is used, and an unknown
//!    name is left untouched;
//! 3. the all sentinel expands to every option value (or the custom all value);
//! 4. a field path is applied after that expansion;
//! 5. `queryparam` and ad-hoc variables render the URL value;
//! 6. everything else goes through the format registry.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;
use stencil_domain::{
    ALL_VARIABLE_TEXT, AdHocFilter, DataSourceInstanceSettings, EngineSettings, ScopedLookup,
    ScopedVar, ScopedVars, VariableKind, VariableModel, VariableValue,
};
use tracing::warn;

use super::builtins::BuiltinVariables;
use super::field_path::FieldPathCache;
use super::formats::{FormatId, FormatInput, FormatSpec, format_value};
use super::parser::{VARIABLE_REGEX, VariableReference, get_variable_name, parse_references};
use crate::adapters::variable_adapter;

/// Caller-supplied formatter used instead of a named format.
pub type FormatFn = dyn Fn(&Value, Option<&VariableModel>) -> String + Send + Sync;

/// The format requested by the caller of [`Interpolator::replace`].
///
/// An inline format in the reference itself takes precedence.
#[derive(Clone)]
pub enum ReplaceFormat {
    /// A registry format, optionally with arguments (`date:seconds`).
    Named(String),
    /// A custom formatter.
    Custom(Arc<FormatFn>),
}

impl fmt::Debug for ReplaceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => f.debug_tuple("Named").field(name).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl From<&str> for ReplaceFormat {
    fn from(name: &str) -> Self {
        Self::Named(name.to_string())
    }
}

impl From<FormatId> for ReplaceFormat {
    fn from(id: FormatId) -> Self {
        Self::Named(id.as_str().to_string())
    }
}

/// Format chosen for one reference.
#[derive(Clone, Copy)]
enum Chosen<'f> {
    Named(&'f str),
    Custom(&'f FormatFn),
    Default,
}

impl Chosen<'_> {
    fn name(&self) -> Option<&str> {
        match self {
            Self::Named(raw) => Some(FormatSpec::parse(raw).name),
            _ => None,
        }
    }

    fn is(&self, id: FormatId) -> bool {
        self.name().is_some_and(|n| n.eq_ignore_ascii_case(id.as_str()))
    }
}

fn variable_value_json(value: &VariableValue) -> Value {
    Value::from(value)
}

/// Interpolates against a registry snapshot.
pub struct Interpolator<'a> {
    variables: &'a IndexMap<String, VariableModel>,
    builtins: &'a BuiltinVariables,
    settings: &'a EngineSettings,
    field_paths: &'a FieldPathCache,
}

impl<'a> Interpolator<'a> {
    /// Creates an interpolator over a snapshot.
    #[must_use]
    pub const fn new(
        variables: &'a IndexMap<String, VariableModel>,
        builtins: &'a BuiltinVariables,
        settings: &'a EngineSettings,
        field_paths: &'a FieldPathCache,
    ) -> Self {
        Self {
            variables,
            builtins,
            settings,
            field_paths,
        }
    }

    /// Finds a registry variable by name.
    #[must_use]
    pub fn variable_by_name(&self, name: &str) -> Option<&'a VariableModel> {
        self.variables.values().find(|v| v.name == name)
    }

    /// Replaces every reference in `target`.
    ///
    /// An empty or missing target yields an empty string. Unknown names are left
    /// as written.
    #[must_use]
    pub fn replace(
        &self,
        target: Option<&str>,
        scoped_vars: Option<&ScopedVars>,
        format: Option<&ReplaceFormat>,
    ) -> String {
        self.replace_at_depth(target, scoped_vars, format, 0)
    }

    fn replace_at_depth(
        &self,
        target: Option<&str>,
        scoped_vars: Option<&ScopedVars>,
        format: Option<&ReplaceFormat>,
        depth: usize,
    ) -> String {
        let Some(target) = target.filter(|t| !t.is_empty()) else {
            return String::new();
        };
        let references = parse_references(target);
        if references.is_empty() {
            return target.to_string();
        }

        let mut result = String::with_capacity(target.len());
        let mut last_end = 0;
        for reference in &references {
            result.push_str(&target[last_end..reference.span.start]);
            let matched = &target[reference.span.clone()];
            result.push_str(&self.resolve(reference, matched, scoped_vars, format, depth));
            last_end = reference.span.end;
        }
        result.push_str(&target[last_end..]);
        result
    }

    fn resolve(
        &self,
        reference: &VariableReference,
        matched: &str,
        scoped_vars: Option<&ScopedVars>,
        format: Option<&ReplaceFormat>,
        depth: usize,
    ) -> String {
        let name = reference.name.as_str();
        let field_path = reference.field_path.as_deref();
        let variable = self.variable_by_name(name);
        let chosen = match (&reference.format, format) {
            (Some(inline), _) => Chosen::Named(inline),
            (None, Some(ReplaceFormat::Named(named))) => Chosen::Named(named),
            (None, Some(ReplaceFormat::Custom(custom))) => Chosen::Custom(custom.as_ref()),
            (None, None) => Chosen::Default,
        };

        if let Some(scoped) = scoped_vars
            && let ScopedLookup::Value(value) = self.get_variable_value(name, field_path, scoped)
        {
            let text = self.get_variable_text(name, &value, scoped);
            return self.format(&value, chosen, variable, &text, name);
        }

        let Some(variable) = variable else {
            return self.resolve_builtin(name, field_path, matched, chosen);
        };

        if chosen.is(FormatId::QueryParam) || matches!(variable.kind, VariableKind::AdHoc(_)) {
            let adapter = variable_adapter(variable.variable_type());
            let value = variable_value_json(&adapter.get_value_for_url(variable));
            let text = if matches!(variable.kind, VariableKind::AdHoc(_)) {
                Value::String(variable.id.clone())
            } else {
                variable_value_json(&variable.current.text)
            };
            return self.format(&value, chosen, Some(variable), &text, name);
        }

        if let Some(system) = variable
            .current
            .value
            .as_single()
            .and_then(|token| self.builtins.system_value(token))
        {
            let value = Value::String(system.to_string());
            return self.format(&value, chosen, Some(variable), &value, name);
        }

        let mut value = variable_value_json(&variable.current.value);
        let mut text = variable_value_json(&variable.current.text);
        if variable.current.value.is_all() {
            text = Value::String(ALL_VARIABLE_TEXT.to_string());
            if let Some(custom) = variable.all_value()
                && !chosen.is(FormatId::Text)
            {
                if depth >= self.settings.max_interpolation_depth {
                    warn!(variable = name, depth, "interpolation depth exceeded");
                    return custom.to_string();
                }
                return self.replace_at_depth(Some(custom), None, None, depth + 1);
            }
            value = variable_value_json(&self.get_all_value(variable));
        }

        if let Some(path) = field_path {
            let mut temporary = ScopedVars::new();
            temporary.insert(name.to_string(), ScopedVar::new(text.clone(), value.clone()));
            if let ScopedLookup::Value(field) =
                self.get_variable_value(name, Some(path), &temporary)
            {
                return self.format(&field, chosen, Some(variable), &text, name);
            }
        }

        self.format(&value, chosen, Some(variable), &text, name)
    }

    fn resolve_builtin(
        &self,
        name: &str,
        field_path: Option<&str>,
        matched: &str,
        chosen: Chosen<'_>,
    ) -> String {
        let Some(builtin) = self.builtins.lookup(name) else {
            return matched.to_string();
        };
        let mut scope = ScopedVars::new();
        scope.insert(name.to_string(), builtin);
        match self.get_variable_value(name, field_path, &scope) {
            ScopedLookup::Value(value) => {
                let text = self.get_variable_text(name, &value, &scope);
                self.format(&value, chosen, None, &text, name)
            }
            ScopedLookup::Null => String::new(),
            ScopedLookup::Absent => matched.to_string(),
        }
    }

    /// Looks a name up in `scoped_vars`, following `field_path` into the value.
    #[must_use]
    pub fn get_variable_value(
        &self,
        name: &str,
        field_path: Option<&str>,
        scoped_vars: &ScopedVars,
    ) -> ScopedLookup {
        let Some(scoped) = scoped_vars.get(name) else {
            return ScopedLookup::Absent;
        };
        match field_path {
            Some(path) => self
                .field_paths
                .accessor(path)
                .get(&scoped.value)
                .map_or(ScopedLookup::Null, |v| ScopedLookup::from_value(v.clone())),
            None => ScopedLookup::from_value(scoped.value.clone()),
        }
    }

    /// Returns the text paired with `value`: the binding's text when the value
    /// is the binding's own value or a string, the value itself otherwise.
    #[must_use]
    pub fn get_variable_text(&self, name: &str, value: &Value, scoped_vars: &ScopedVars) -> Value {
        match scoped_vars.get(name) {
            Some(scoped) if scoped.value == *value || value.is_string() => scoped.text.clone(),
            _ => value.clone(),
        }
    }

    /// Expands the all sentinel: the custom all value, or every non-sentinel option value.
    #[must_use]
    pub fn get_all_value(&self, variable: &VariableModel) -> VariableValue {
        if let Some(custom) = variable.all_value() {
            return VariableValue::Single(custom.to_string());
        }
        VariableValue::Multi(
            variable
                .options
                .iter()
                .filter(|o| !o.is_all())
                .flat_map(|o| o.value.values())
                .map(str::to_string)
                .collect(),
        )
    }

    fn format(
        &self,
        value: &Value,
        chosen: Chosen<'_>,
        variable: Option<&VariableModel>,
        text: &Value,
        name: &str,
    ) -> String {
        if value.is_null() {
            return String::new();
        }
        if variable.is_some_and(|v| matches!(v.kind, VariableKind::AdHoc(_)))
            && !chosen.is(FormatId::QueryParam)
        {
            return String::new();
        }
        let raw = match chosen {
            Chosen::Custom(custom) => return custom(value, variable),
            Chosen::Named(raw) => raw,
            Chosen::Default => self.settings.default_format.as_str(),
        };
        let spec = FormatSpec::parse(raw);
        let id = spec.name.parse::<FormatId>().unwrap_or_else(|_| {
            warn!(format = spec.name, "variable format not found, using glob");
            FormatId::Glob
        });
        // Structured values render through their text unless asked for JSON.
        let value = match value {
            Value::Object(_) if id != FormatId::Json && !text.is_object() => text,
            other => other,
        };
        let input = FormatInput {
            value,
            text,
            args: &spec.args,
            name,
            url_param_prefix: &self.settings.url_param_prefix,
            timezone: &self.settings.timezone,
        };
        format_value(id, &input)
    }

    /// Returns true if the first reference in `expression` names a known variable.
    #[must_use]
    pub fn variable_exists(&self, expression: &str) -> bool {
        get_variable_name(expression).is_some_and(|name| self.is_known(&name))
    }

    /// Returns true if `target` references any known variable.
    #[must_use]
    pub fn contains_template(&self, target: &str) -> bool {
        VARIABLE_REGEX.is_match(target)
            && parse_references(target)
                .iter()
                .any(|r| self.is_known(&r.name))
    }

    fn is_known(&self, name: &str) -> bool {
        self.variable_by_name(name).is_some() || self.builtins.contains(name)
    }

    /// Collects the filters of ad-hoc variables that target `datasource`.
    ///
    /// A variable matches by uid or name, or through a data source reference that
    /// is itself a variable resolving to `datasource_name`.
    #[must_use]
    pub fn get_adhoc_filters(
        &self,
        datasource: &DataSourceInstanceSettings,
        datasource_name: &str,
    ) -> Vec<AdHocFilter> {
        let mut filters = Vec::new();
        for variable in self.variables.values() {
            let VariableKind::AdHoc(adhoc) = &variable.kind else {
                continue;
            };
            let Some(uid) = adhoc.datasource.as_ref().and_then(|d| d.uid.as_deref()) else {
                continue;
            };
            let matches = if uid == datasource.uid || uid == datasource.name {
                true
            } else if uid.starts_with('$') {
                self.replace(Some(uid), None, None) == datasource_name
            } else {
                false
            };
            if matches {
                filters.extend(adhoc.filters.iter().cloned());
            }
        }
        filters
    }
}

//! Output of a CLI run.

use std::fmt::Write as _;

use serde::Serialize;
use stencil_application::TemplatingSession;
use stencil_application::ports::Notification;
use stencil_domain::{LoadingState, SerializedError, VariableValue};

/// One interpolated template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Interpolation {
    /// Input text.
    pub template: String,
    /// Text with every reference replaced.
    pub result: String,
}

/// State of one variable after loading.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariableReport {
    /// Variable name.
    pub name: String,
    /// Kind, e.g. `query`.
    #[serde(rename = "type")]
    pub variable_type: &'static str,
    /// Current text.
    pub text: String,
    /// Current value.
    pub value: VariableValue,
    /// Number of options.
    pub options: usize,
    /// Loading state.
    pub state: LoadingState,
    /// Error of the last failed refresh.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<SerializedError>,
}

/// Everything a run resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    /// Dashboard uid.
    pub uid: String,
    /// Variables in display order.
    pub variables: Vec<VariableReport>,
    /// Interpolated templates.
    pub interpolations: Vec<Interpolation>,
    /// Final URL query string.
    pub url_query: String,
    /// Error notifications raised while loading, as `title: message`.
    pub notifications: Vec<String>,
    /// Whether the dashboard was written back.
    pub saved: bool,
}

impl Report {
    /// Collects the report from a loaded session.
    #[must_use]
    pub fn new(
        session: &TemplatingSession,
        interpolations: Vec<Interpolation>,
        url_query: String,
        notifications: &[Notification],
        saved: bool,
    ) -> Self {
        let uid = session
            .store()
            .read(|state| state.dashboard.as_ref().map(|d| d.uid.clone()))
            .unwrap_or_default();
        let variables = session
            .variables()
            .into_iter()
            .map(|v| VariableReport {
                variable_type: v.variable_type().as_str(),
                text: v.current_text(),
                value: v.current.value.clone(),
                options: v.options.len(),
                state: v.state,
                error: v.error.clone(),
                name: v.name,
            })
            .collect();
        Self {
            uid,
            variables,
            interpolations,
            url_query,
            notifications: notifications
                .iter()
                .map(|n| format!("{}: {}", n.title, n.message))
                .collect(),
            saved,
        }
    }

    /// Renders the report as text or pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render(&self, json: bool) -> anyhow::Result<String> {
        if json {
            let mut out = serde_json::to_string_pretty(self)?;
            out.push('\n');
            Ok(out)
        } else {
            Ok(self.to_text())
        }
    }

    /// Renders the report as aligned text.
    #[must_use]
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let width = self.variables.iter().map(|v| v.name.len()).max().unwrap_or(0);

        let _ = writeln!(out, "dashboard {} ({} variables)", self.uid, self.variables.len());
        for v in &self.variables {
            let _ = write!(out, "  {:width$}  {:<10} {}", v.name, v.variable_type, v.text);
            if let Some(error) = &v.error {
                let _ = write!(out, "  (error: {})", error.message);
            }
            out.push('\n');
        }
        if !self.interpolations.is_empty() {
            out.push_str("interpolations:\n");
            for i in &self.interpolations {
                let _ = writeln!(out, "  {} => {}", i.template, i.result);
            }
        }
        let _ = writeln!(out, "url: {}", self.url_query);
        for n in &self.notifications {
            let _ = writeln!(out, "error: {n}");
        }
        if self.saved {
            out.push_str("saved\n");
        }
        out
    }
}

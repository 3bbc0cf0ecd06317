//! Built-in variables
//!
//! `__from`, `__to`, `__interval`, `__interval_ms`, `__dashboard`, `__user` and
//! `__org` are a fixed set of entries consulted after the user-defined
//! variables. Auto-interval values of interval variables live here too, keyed by
//! their `$__auto_interval_<name>` token.

use std::collections::HashMap;

use serde_json::{Value, json};
use stencil_domain::{
    AUTO_INTERVAL_PREFIX, Interval, OrgInfo, ScopedVar, TimeRange, UserInfo,
};

/// Names of the built-in variables.
pub const BUILTIN_NAMES: [&str; 7] = [
    "__from",
    "__to",
    "__interval",
    "__interval_ms",
    "__dashboard",
    "__user",
    "__org",
];

/// Dashboard identity exposed as `__dashboard`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DashboardInfo {
    /// Dashboard uid.
    pub uid: String,
    /// Dashboard title.
    pub title: String,
}

/// The values behind the built-in variables of one session.
#[derive(Debug, Clone, Default)]
pub struct BuiltinVariables {
    time_range: Option<TimeRange>,
    interval: Option<Interval>,
    dashboard: Option<DashboardInfo>,
    user: Option<UserInfo>,
    org: Option<OrgInfo>,
    system_values: HashMap<String, String>,
}

impl BuiltinVariables {
    /// Creates an empty set; every built-in is unresolved until set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the time range and the interval derived from it.
    pub fn set_time_range(&mut self, range: TimeRange, interval: Option<Interval>) {
        self.time_range = Some(range);
        self.interval = interval;
    }

    /// Returns the current time range.
    #[must_use]
    pub const fn time_range(&self) -> Option<&TimeRange> {
        self.time_range.as_ref()
    }

    /// Sets the dashboard identity.
    pub fn set_dashboard(&mut self, dashboard: DashboardInfo) {
        self.dashboard = Some(dashboard);
    }

    /// Sets the signed-in user.
    pub fn set_user(&mut self, user: UserInfo) {
        self.user = Some(user);
    }

    /// Sets the organization.
    pub fn set_org(&mut self, org: OrgInfo) {
        self.org = Some(org);
    }

    /// Records the automatic interval of the interval variable `name`.
    ///
    /// Also updates the unqualified `$__auto_interval` token.
    pub fn set_auto_interval(&mut self, name: &str, interval: &str) {
        self.system_values
            .insert(format!("{AUTO_INTERVAL_PREFIX}{name}"), interval.to_string());
        self.system_values
            .insert("$__auto_interval".to_string(), interval.to_string());
    }

    /// Returns the value behind a system token such as `$__auto_interval_x`.
    #[must_use]
    pub fn system_value(&self, token: &str) -> Option<&str> {
        self.system_values.get(token).map(String::as_str)
    }

    /// Looks up a built-in by name.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<ScopedVar> {
        match name {
            "__from" => self.time_range.as_ref().map(|r| {
                ScopedVar::new(
                    r.from.to_rfc3339(),
                    Value::from(r.from.timestamp_millis()),
                )
            }),
            "__to" => self.time_range.as_ref().map(|r| {
                ScopedVar::new(r.to.to_rfc3339(), Value::from(r.to.timestamp_millis()))
            }),
            "__interval" => self
                .interval
                .as_ref()
                .map(|i| ScopedVar::value(i.interval.clone())),
            "__interval_ms" => self
                .interval
                .as_ref()
                .map(|i| ScopedVar::new(i.interval_ms.to_string(), Value::from(i.interval_ms))),
            "__dashboard" => self.dashboard.as_ref().map(|d| {
                ScopedVar::new(d.uid.clone(), json!({"name": d.title, "uid": d.uid}))
            }),
            "__user" => self.user.as_ref().map(|u| {
                ScopedVar::new(
                    u.login.clone(),
                    json!({"id": u.id, "login": u.login, "email": u.email, "name": u.name}),
                )
            }),
            "__org" => self
                .org
                .as_ref()
                .map(|o| ScopedVar::new(o.name.clone(), json!({"id": o.id, "name": o.name}))),
            _ => None,
        }
    }

    /// Returns true if `name` is a built-in that currently has a value.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }
}

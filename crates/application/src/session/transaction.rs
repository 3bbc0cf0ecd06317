//! Bulk refreshes: dashboard load and time-range changes.

use std::collections::HashSet;

use futures::future::join_all;
use stencil_domain::{
    Dashboard, OrgInfo, RawTimeRange, TimeRange, UserInfo, VariableKind, VariableModel,
    VariableRefresh, calculate_interval, generate_id,
};
use tracing::{debug, error, info, warn};

use super::TemplatingSession;
use crate::adapters::fix_selected_inconsistency;
use crate::error::{ApplicationError, ApplicationResult};
use crate::graph::DependencyGraph;
use crate::ports::{Notification, UrlQueryMap, VariablesChanged};
use crate::store::TemplatingAction;
use crate::variable_resolver::DashboardInfo;

/// Input of a dashboard load.
#[derive(Debug, Clone, Default)]
pub struct InitOptions {
    /// The dashboard whose variables are loaded.
    pub dashboard: Dashboard,
    /// Overrides the dashboard's default time range.
    pub time_range: Option<RawTimeRange>,
    /// The signed-in user.
    pub user: Option<UserInfo>,
    /// The current organization.
    pub org: Option<OrgInfo>,
}

impl InitOptions {
    /// Loads `dashboard` with its own time range.
    #[must_use]
    pub fn new(dashboard: Dashboard) -> Self {
        Self {
            dashboard,
            ..Self::default()
        }
    }
}

impl TemplatingSession {
    /// Loads the variables of a dashboard and resolves every one of them.
    ///
    /// A transaction still running is cancelled first. Variables resolve
    /// concurrently, each once the variables it references are done. A URL
    /// value takes precedence over a refresh.
    ///
    /// # Errors
    ///
    /// Fails if the time range does not parse. Failed option refreshes are
    /// reported per variable and do not fail the load.
    pub async fn init(&self, options: InitOptions) -> ApplicationResult<()> {
        if self.store.read(|state| state.transaction.is_fetching()) {
            info!(session = %self.id, "cancelling the running variables transaction");
        }
        self.store.dispatch(TemplatingAction::TransactionCleanup);

        let uid = generate_id();
        let generation = self.generation();
        self.store
            .dispatch(TemplatingAction::TransactionInit(uid.clone()));
        debug!(session = %self.id, transaction = %uid, dashboard = %options.dashboard.uid, "variables transaction started");

        match self.load_variables(options, generation).await {
            Ok(()) => {
                if self
                    .store
                    .dispatch(TemplatingAction::TransactionComplete(uid.clone()))
                {
                    debug!(transaction = %uid, "variables transaction completed");
                }
                Ok(())
            }
            Err(ApplicationError::Cancelled) => {
                debug!(transaction = %uid, "variables transaction cancelled");
                Ok(())
            }
            Err(e) => {
                error!(transaction = %uid, error = %e, "error initializing variables");
                self.ports
                    .events
                    .notify(Notification::error("Error initializing variables", e.to_string()));
                Err(e)
            }
        }
    }

    fn resolve_time_range(&self, raw: RawTimeRange) -> ApplicationResult<TemplatingAction> {
        let range = TimeRange::parse(raw, self.ports.clock.now())?;
        let interval = calculate_interval(&range, self.settings.interval_resolution, None)?;
        Ok(TemplatingAction::SetTimeRange {
            range,
            interval: Some(interval),
        })
    }

    async fn load_variables(&self, options: InitOptions, generation: u64) -> ApplicationResult<()> {
        let InitOptions {
            dashboard,
            time_range,
            user,
            org,
        } = options;

        let raw = time_range
            .or_else(|| dashboard.time.clone())
            .unwrap_or_default();
        self.store.dispatch(self.resolve_time_range(raw)?);
        self.store
            .dispatch(TemplatingAction::SetDashboardInfo(DashboardInfo {
                uid: dashboard.uid.clone(),
                title: dashboard.title.clone(),
            }));
        if let Some(user) = user {
            self.store.dispatch(TemplatingAction::SetUser(user));
        }
        if let Some(org) = org {
            self.store.dispatch(TemplatingAction::SetOrg(org));
        }

        let mut seen = HashSet::new();
        for (index, persisted) in dashboard.templating.list.iter().enumerate() {
            if !seen.insert(persisted.name.clone()) {
                warn!(variable = %persisted.name, "skipping duplicate variable");
                continue;
            }
            let mut variable = VariableModel::from_persisted(persisted.clone(), index, false);
            fix_selected_inconsistency(&mut variable);
            self.store.dispatch(TemplatingAction::AddVariable(variable));
        }
        self.store.dispatch(TemplatingAction::SetDashboard(dashboard));

        self.process_variables(generation).await
    }

    async fn process_variables(&self, generation: u64) -> ApplicationResult<()> {
        let (ids, graph) = self.store.read(|state| {
            (
                state.variables.keys().cloned().collect::<Vec<_>>(),
                DependencyGraph::build(state.variables.values()),
            )
        });
        let cyclic: HashSet<String> = graph.topological_order().cyclic.into_iter().collect();
        let url = self.ports.location.get_search();

        let results = join_all(ids.iter().map(|id| {
            let dependencies: Vec<String> = graph
                .dependencies_of(id)
                .iter()
                .filter(|d| !cyclic.contains(*d))
                .cloned()
                .collect();
            self.process_variable(id, dependencies, &url, generation)
        }))
        .await;

        for result in results {
            result?;
        }
        Ok(())
    }

    async fn process_variable(
        &self,
        id: &str,
        dependencies: Vec<String>,
        url: &UrlQueryMap,
        generation: u64,
    ) -> ApplicationResult<()> {
        self.store
            .wait_until(|state| {
                state.generation != generation || dependencies.iter().all(|d| state.is_settled(d))
            })
            .await;
        if self.generation() != generation {
            return Err(ApplicationError::Cancelled);
        }

        let variable = self.require(id)?;
        let param = self.settings.url_param(&variable.name);
        if let Some(url_value) = url.get(&param) {
            self.set_value_from_url(&variable, url_value).await?;
        } else if matches!(
            variable.refresh(),
            Some(VariableRefresh::OnDashboardLoad | VariableRefresh::OnTimeRangeChanged)
        ) || needs_initial_options(&variable)
        {
            self.refresh_variable(id, None).await?;
        }

        if !self.store.read(|state| state.is_settled(id)) {
            self.store
                .dispatch(TemplatingAction::VariableStateCompleted(id.to_string()));
        }
        Ok(())
    }

    /// Applies a new dashboard time range.
    ///
    /// Only variables refreshing on time-range changes are refreshed, one at a
    /// time, each after the variables it references. If any options changed the
    /// dashboard is asked to refresh.
    ///
    /// # Errors
    ///
    /// Fails if the time range does not parse.
    pub async fn on_time_range_updated(&self, raw: RawTimeRange) -> ApplicationResult<()> {
        self.store.dispatch(self.resolve_time_range(raw)?);

        let ids: Vec<String> = self.store.read(|state| {
            let order = DependencyGraph::build(state.variables.values()).topological_order();
            order
                .order
                .into_iter()
                .chain(order.cyclic)
                .filter(|id| {
                    state.variables.get(id).and_then(VariableModel::refresh)
                        == Some(VariableRefresh::OnTimeRangeChanged)
                })
                .collect()
        });
        debug!(variables = ?ids, "refreshing variables after time range change");

        self.store
            .dispatch(TemplatingAction::MarkPendingRefresh(ids.clone()));
        let mut changed = false;
        for id in &ids {
            let result = self.refresh_variable(id, None).await;
            self.store
                .dispatch(TemplatingAction::ClearPendingRefresh(id.clone()));
            match result {
                Ok(options_changed) => changed |= options_changed,
                Err(ApplicationError::Cancelled) => return Ok(()),
                Err(e) => return Err(e),
            }
        }

        if changed {
            self.ports.events.refresh_dashboard(&VariablesChanged {
                refresh_all: true,
                variables: ids.clone(),
            });
        }
        self.ports.events.time_range_processed(&ids);
        Ok(())
    }
}

/// Kinds whose options are derived locally and were not saved with the dashboard.
fn needs_initial_options(variable: &VariableModel) -> bool {
    match variable.kind {
        VariableKind::Custom(_) => true,
        VariableKind::Constant(_) | VariableKind::TextBox(_) => variable.options.is_empty(),
        _ => false,
    }
}

//! Reconciliation engine - decide and apply the minimal mutation
//!
//! Every call lists the remote collection afresh, resolves the target with the
//! matcher, plans one of create / replace / update / delete / no-op, executes
//! it through the adapter, and optionally waits for completion.

use crate::adapter::{OperationHandle, ResourceAdapter};
use crate::error::{Error, ReconcileError};
use crate::matcher;
use crate::tracker::{LogCallback, OperationTracker, PollConfig, Probe, WaitCallback, WaitError};
use crate::types::{Action, Intent, ReconcileRequest, ReconcileResult, ResourceSummary};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Behaviour flags for one reconciliation call
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReconcileOptions {
    /// Block until asynchronous mutations finish
    pub wait: bool,
    /// Budget for each wait
    pub wait_timeout: Duration,
    /// Permit destroy-and-recreate when immutable properties change
    pub allow_replace: bool,
    pub poll: PollConfig,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            wait: true,
            wait_timeout: Duration::from_secs(600),
            allow_replace: false,
            poll: PollConfig::default(),
        }
    }
}

/// Decision reached against a just-listed collection
#[derive(Debug, Clone, PartialEq)]
pub enum Plan {
    /// Nothing matches; create from scratch
    Create,
    /// Immutable properties differ; create a new object, then delete this one
    Replace { existing: ResourceSummary },
    /// Update this object in place
    Update { existing: ResourceSummary },
    /// Remove this object
    Delete { existing: ResourceSummary },
    /// Desired state already satisfied
    Noop { existing: Option<ResourceSummary> },
}

impl Plan {
    /// Action reported for this plan (a replace reports `create`)
    pub fn action(&self) -> Action {
        match self {
            Plan::Create | Plan::Replace { .. } => Action::Create,
            Plan::Update { .. } => Action::Update,
            Plan::Delete { .. } => Action::Delete,
            Plan::Noop { .. } => Action::None,
        }
    }

    pub fn is_change(&self) -> bool {
        !matches!(self, Plan::Noop { .. })
    }

    /// The result this plan would produce, without touching the remote side
    pub fn preview(&self) -> ReconcileResult {
        match self {
            Plan::Create => ReconcileResult::changed(Action::Create, None),
            Plan::Replace { existing } => {
                let mut result = ReconcileResult::changed(Action::Create, None);
                result.replaced_id = existing.id().map(str::to_string);
                result
            }
            Plan::Update { existing } | Plan::Delete { existing } => {
                ReconcileResult::changed(self.action(), Some(existing.clone()))
            }
            Plan::Noop { existing } => ReconcileResult::unchanged(existing.clone()),
        }
    }
}

/// How a wait ended when it did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Settled {
    /// Nothing to wait for, or waiting is off
    Skipped,
    Completed,
    TimedOut,
}

/// Drives one adapter from desired state to remote state
pub struct Reconciler<'a, A: ResourceAdapter + ?Sized> {
    adapter: &'a A,
    options: ReconcileOptions,
    callback: &'a dyn WaitCallback,
}

impl<'a, A: ResourceAdapter + ?Sized> Reconciler<'a, A> {
    pub fn new(adapter: &'a A, options: ReconcileOptions) -> Self {
        Self {
            adapter,
            options,
            callback: &LogCallback,
        }
    }

    /// Use `callback` for poll notifications while waiting
    pub fn with_callback(mut self, callback: &'a dyn WaitCallback) -> Self {
        self.callback = callback;
        self
    }

    pub fn options(&self) -> &ReconcileOptions {
        &self.options
    }

    /// Decide what `request` requires without mutating anything
    pub fn plan(&self, request: &ReconcileRequest) -> Result<Plan, ReconcileError> {
        self.plan_inner(request)
            .map_err(|e| self.fail(request.intent.default_action(), e))
    }

    /// Plan and execute `request`
    pub fn reconcile(&self, request: &ReconcileRequest) -> Result<ReconcileResult, ReconcileError> {
        let plan = self.plan(request)?;
        log::info!(
            "{}: state '{}' planned action {}",
            self.adapter.kind(),
            request.intent,
            plan.action()
        );
        self.execute(plan, request)
    }

    fn plan_inner(&self, request: &ReconcileRequest) -> Result<Plan, Error> {
        let kind = self.adapter.kind();

        for field in self.adapter.required_fields(request.intent) {
            if !request.desired.is_set(field) {
                return Err(Error::MissingParameter {
                    kind: kind.to_string(),
                    intent: request.intent,
                    field: (*field).to_string(),
                });
            }
        }

        let key = self.lookup_key(request)?;
        let collection = self.adapter.list()?;
        let existing = matcher::find(kind, &collection, &key, self.adapter.identity())?.cloned();
        log::debug!(
            "{kind}: '{key}' resolved to {}",
            existing
                .as_ref()
                .and_then(ResourceSummary::id)
                .unwrap_or("nothing")
        );

        match (request.intent, existing) {
            (Intent::Present, None) => Ok(Plan::Create),
            (Intent::Present, Some(existing)) => self.replace_or_update(existing, request),
            (Intent::Update, None) => {
                if self.adapter.fail_on_missing_update() {
                    Err(Error::NotFound {
                        kind: kind.to_string(),
                        identifier: key,
                    })
                } else {
                    Ok(Plan::Noop { existing: None })
                }
            }
            (Intent::Update, Some(existing)) => {
                self.check_name_collision(&collection, &existing, request)?;
                self.replace_or_update(existing, request)
            }
            (Intent::Absent, None) => Ok(Plan::Noop { existing: None }),
            (Intent::Absent, Some(existing)) => Ok(Plan::Delete { existing }),
        }
    }

    fn lookup_key(&self, request: &ReconcileRequest) -> Result<String, Error> {
        request
            .identifier
            .clone()
            .or_else(|| self.adapter.desired_name(&request.desired))
            .ok_or_else(|| Error::MissingIdentifier {
                kind: self.adapter.kind().to_string(),
                intent: request.intent,
            })
    }

    fn replace_or_update(
        &self,
        existing: ResourceSummary,
        request: &ReconcileRequest,
    ) -> Result<Plan, Error> {
        if self.adapter.should_replace(&existing, &request.desired) {
            if !self.options.allow_replace {
                return Err(Error::ReplacementNotAllowed {
                    kind: self.adapter.kind().to_string(),
                    identifier: describe(&existing),
                });
            }
            return Ok(Plan::Replace { existing });
        }
        if self.adapter.should_update(&existing, &request.desired) {
            return Ok(Plan::Update { existing });
        }
        Ok(Plan::Noop {
            existing: Some(existing),
        })
    }

    /// A rename must not take over a name owned by another live object
    fn check_name_collision(
        &self,
        collection: &[ResourceSummary],
        existing: &ResourceSummary,
        request: &ReconcileRequest,
    ) -> Result<(), Error> {
        let Some(name) = self.adapter.desired_name(&request.desired) else {
            return Ok(());
        };
        let owner = matcher::named(collection, &name, self.adapter.identity())
            .find(|other| other.id() != existing.id());
        match owner {
            Some(owner) => Err(Error::NameCollision {
                kind: self.adapter.kind().to_string(),
                name,
                existing_id: describe(owner),
            }),
            None => Ok(()),
        }
    }

    /// Carry out a plan produced by [`Reconciler::plan`]
    pub fn execute(
        &self,
        plan: Plan,
        request: &ReconcileRequest,
    ) -> Result<ReconcileResult, ReconcileError> {
        match plan {
            Plan::Create => self.create(request),
            Plan::Replace { existing } => self.replace(&existing, request),
            Plan::Update { existing } => self.update(&existing, request),
            Plan::Delete { existing } => self.delete(&existing),
            Plan::Noop { existing } => Ok(ReconcileResult::unchanged(existing)),
        }
    }

    /// Create, unless the desired name already resolves in a fresh listing
    fn create(&self, request: &ReconcileRequest) -> Result<ReconcileResult, ReconcileError> {
        let kind = self.adapter.kind();

        if let Some(name) = self.adapter.desired_name(&request.desired) {
            let collection = self
                .adapter
                .list()
                .map_err(|e| self.fail(Action::Create, e))?;
            let found = matcher::find(kind, &collection, &name, self.adapter.identity())
                .map_err(|e| self.fail(Action::Create, e))?;
            if let Some(existing) = found {
                log::info!("{kind}: '{name}' already exists, not creating another");
                let plan = self
                    .replace_or_update(existing.clone(), request)
                    .map_err(|e| self.fail(Action::Create, e))?;
                return self.execute(plan, request);
            }
        }

        let mutation = self
            .adapter
            .create(&request.desired, None)
            .map_err(|e| self.fail(Action::Create, e))?;
        let mut result = ReconcileResult::changed(Action::Create, Some(mutation.resource));
        let subject = result.resource.as_ref().map(describe).unwrap_or_default();
        let settled = self.await_completion(
            mutation.handle.as_ref(),
            Action::Create,
            &subject,
            &mut result.warnings,
        )?;
        if settled == Settled::Completed {
            self.refresh(&mut result);
        }
        Ok(result)
    }

    /// Create the replacement first, then remove the old object
    fn replace(
        &self,
        existing: &ResourceSummary,
        request: &ReconcileRequest,
    ) -> Result<ReconcileResult, ReconcileError> {
        let mutation = self
            .adapter
            .create(&request.desired, Some(existing))
            .map_err(|e| self.fail(Action::Create, e))?;
        let mut result = ReconcileResult::changed(Action::Create, Some(mutation.resource));

        let subject = result.resource.as_ref().map(describe).unwrap_or_default();
        let settled = self.await_completion(
            mutation.handle.as_ref(),
            Action::Create,
            &subject,
            &mut result.warnings,
        )?;
        match settled {
            Settled::TimedOut => {
                // The old object stays until its replacement is known to be ready
                let warning = format!(
                    "kept {} {} because its replacement {subject} is not ready yet; \
                     remove it once {subject} has finished provisioning",
                    self.adapter.kind(),
                    describe(existing)
                );
                log::warn!("{warning}");
                result.warnings.push(warning);
                return Ok(result);
            }
            Settled::Completed => self.refresh(&mut result),
            Settled::Skipped => {}
        }
        result.replaced_id = existing.id().map(str::to_string);

        match self.adapter.delete(existing) {
            Ok(handle) => {
                let handle = handle.or_else(|| self.removal_handle(existing));
                self.await_completion(
                    handle.as_ref(),
                    Action::Delete,
                    &describe(existing),
                    &mut result.warnings,
                )?;
            }
            Err(e) if e.is_not_found() => {
                log::debug!("{}: replaced object already gone", self.adapter.kind());
            }
            Err(e) => return Err(self.fail(Action::Delete, e)),
        }
        Ok(result)
    }

    fn update(
        &self,
        existing: &ResourceSummary,
        request: &ReconcileRequest,
    ) -> Result<ReconcileResult, ReconcileError> {
        let mutation = match self.adapter.update(existing, &request.desired) {
            Ok(mutation) => mutation,
            Err(e) if e.is_not_found() => {
                log::info!(
                    "{}: {} disappeared before the update",
                    self.adapter.kind(),
                    describe(existing)
                );
                return Ok(ReconcileResult::unchanged(None));
            }
            Err(e) => return Err(self.fail(Action::Update, e)),
        };

        let mut result = ReconcileResult::changed(Action::Update, Some(mutation.resource));
        let settled = self.await_completion(
            mutation.handle.as_ref(),
            Action::Update,
            &describe(existing),
            &mut result.warnings,
        )?;
        if settled == Settled::Completed {
            self.refresh(&mut result);
        }
        Ok(result)
    }

    fn delete(&self, existing: &ResourceSummary) -> Result<ReconcileResult, ReconcileError> {
        let handle = match self.adapter.delete(existing) {
            Ok(handle) => handle.or_else(|| self.removal_handle(existing)),
            Err(e) if e.is_not_found() => return Ok(ReconcileResult::unchanged(None)),
            Err(e) => return Err(self.fail(Action::Delete, e)),
        };

        let mut result = ReconcileResult::changed(Action::Delete, Some(existing.clone()));
        self.await_completion(
            handle.as_ref(),
            Action::Delete,
            &describe(existing),
            &mut result.warnings,
        )?;
        Ok(result)
    }

    /// Swap the mutation response for the object as listed now
    fn refresh(&self, result: &mut ReconcileResult) {
        let kind = self.adapter.kind();
        let Some(id) = result
            .resource
            .as_ref()
            .and_then(ResourceSummary::id)
            .map(str::to_string)
        else {
            return;
        };
        match self.adapter.fetch(&id) {
            Ok(Some(fresh)) => result.resource = Some(fresh),
            Ok(None) => log::debug!("{kind}: {id} is not listed after completion"),
            Err(e) => {
                let warning = format!("could not re-read {kind} {id} after completion: {e}");
                log::warn!("{warning}");
                result.warnings.push(warning);
            }
        }
    }

    fn removal_handle(&self, existing: &ResourceSummary) -> Option<OperationHandle> {
        existing.id().map(OperationHandle::until_gone)
    }

    /// Wait for `handle` if waiting is enabled.
    ///
    /// A timeout leaves the mutation in place and becomes a warning on the result.
    fn await_completion(
        &self,
        handle: Option<&OperationHandle>,
        action: Action,
        subject: &str,
        warnings: &mut Vec<String>,
    ) -> Result<Settled, ReconcileError> {
        let Some(handle) = handle else {
            return Ok(Settled::Skipped);
        };
        if !self.options.wait {
            return Ok(Settled::Skipped);
        }

        let kind = self.adapter.kind();
        let tracker = OperationTracker::with_callback(self.options.poll, self.callback);
        let label = format!("{kind} {subject}");
        let outcome = tracker.wait(&label, self.options.wait_timeout, || {
            match self.adapter.probe(handle) {
                Err(e) if action == Action::Delete && e.is_not_found() => Ok(Probe::Done),
                other => other,
            }
        });

        match outcome {
            Ok(()) => Ok(Settled::Completed),
            Err(WaitError::TimedOut { .. }) => {
                let warning = Error::Timeout {
                    kind: kind.to_string(),
                    identifier: subject.to_string(),
                    action,
                    timeout: self.options.wait_timeout,
                }
                .to_string();
                log::warn!("{warning}");
                warnings.push(warning);
                Ok(Settled::TimedOut)
            }
            Err(WaitError::Failed { message }) => Err(self.fail(
                action,
                Error::OperationFailed {
                    kind: kind.to_string(),
                    action,
                    message,
                },
            )),
            Err(WaitError::Probe(e)) => Err(self.fail(action, e)),
        }
    }

    fn fail(&self, action: Action, error: impl Into<Error>) -> ReconcileError {
        ReconcileError::new(self.adapter.kind(), action, error)
    }
}

/// Short human label for an object: its id, or `<unknown>`
fn describe(resource: &ResourceSummary) -> String {
    resource.id().unwrap_or("<unknown>").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{MockAdapter, MockWait};
    use crate::error::AdapterError;
    use crate::types::DesiredState;
    use serde_json::json;

    fn fast_options() -> ReconcileOptions {
        ReconcileOptions {
            wait: true,
            wait_timeout: Duration::from_secs(2),
            allow_replace: false,
            poll: PollConfig::flat(Duration::from_millis(1)),
        }
    }

    fn db_clusters() -> MockAdapter {
        MockAdapter::new("cluster")
            .with_immutable(&["location"])
            .with_object("A1", json!({"name": "db-prod", "location": "de/fra"}))
    }

    fn present(name: &str) -> ReconcileRequest {
        ReconcileRequest::new(
            Intent::Present,
            DesiredState::new()
                .with("name", name)
                .with("location", "de/fra"),
        )
    }

    #[test]
    fn test_present_creates_when_missing() {
        let mock = MockAdapter::new("cluster");
        let engine = Reconciler::new(&mock, fast_options());

        let result = engine.reconcile(&present("db-prod")).unwrap();

        assert!(result.changed);
        assert_eq!(result.action, Action::Create);
        assert_eq!(mock.objects().len(), 1);
        let resource = result.resource.unwrap();
        assert_eq!(resource.as_value()["properties"]["name"], "db-prod");
    }

    #[test]
    fn test_present_twice_is_idempotent() {
        let mock = MockAdapter::new("cluster");
        let engine = Reconciler::new(&mock, fast_options());
        let request = present("db-prod");

        let first = engine.reconcile(&request).unwrap();
        let second = engine.reconcile(&request).unwrap();

        assert!(first.changed);
        assert!(!second.changed);
        assert_eq!(second.action, Action::None);
        assert_eq!(mock.objects().len(), 1);
        assert_eq!(second.resource.unwrap().id(), first.resource.unwrap().id());
    }

    #[test]
    fn test_present_then_absent_leaves_no_orphan() {
        let mock = MockAdapter::new("cluster").with_object("other", json!({"name": "keep-me"}));
        let engine = Reconciler::new(&mock, fast_options());

        let created = engine.reconcile(&present("db-prod")).unwrap();
        let id = created.resource.unwrap().id().unwrap().to_string();

        let removal = ReconcileRequest::new(Intent::Absent, DesiredState::new()).with_identifier(&id);
        let removed = engine.reconcile(&removal).unwrap();

        assert!(removed.changed);
        assert_eq!(removed.action, Action::Delete);
        assert_eq!(removed.resource.unwrap().id(), Some(id.as_str()));
        let remaining: Vec<_> = mock.objects().iter().map(|o| o.id().unwrap().to_string()).collect();
        assert_eq!(remaining, vec!["other"]);
    }

    #[test]
    fn test_idempotent_creation_guard_relists_by_name() {
        // Identifier names a missing id, but the desired name already exists
        let mock = db_clusters();
        let engine = Reconciler::new(&mock, fast_options());
        let request = present("db-prod").with_identifier("missing-id");

        let plan = engine.plan(&request).unwrap();
        assert_eq!(plan, Plan::Create);

        let result = engine.reconcile(&request).unwrap();
        assert!(!result.changed);
        assert_eq!(mock.objects().len(), 1);
        assert!(!mock.calls().contains(&"create".to_string()));
        // Initial lookup plus the fresh listing inside the guard
        assert_eq!(mock.calls().iter().filter(|c| *c == "list").count(), 3);
    }

    #[test]
    fn test_update_renames() {
        let mock = db_clusters();
        let engine = Reconciler::new(&mock, fast_options());
        let request = ReconcileRequest::new(
            Intent::Update,
            DesiredState::new().with("name", "db-staging"),
        )
        .with_identifier("A1");

        let result = engine.reconcile(&request).unwrap();

        assert!(result.changed);
        assert_eq!(result.action, Action::Update);
        let resource = result.resource.unwrap();
        assert_eq!(resource.id(), Some("A1"));
        assert_eq!(resource.as_value()["properties"]["name"], "db-staging");
    }

    #[test]
    fn test_update_name_collision() {
        let mock = db_clusters().with_object("B2", json!({"name": "db-staging", "location": "de/fra"}));
        let engine = Reconciler::new(&mock, fast_options());
        let request = ReconcileRequest::new(
            Intent::Update,
            DesiredState::new().with("name", "db-staging"),
        )
        .with_identifier("A1");

        let err = engine.reconcile(&request).unwrap_err();

        assert_eq!(err.action, Action::Update);
        match &err.error {
            Error::NameCollision { name, existing_id, .. } => {
                assert_eq!(name, "db-staging");
                assert_eq!(existing_id, "B2");
            }
            other => panic!("Expected NameCollision, got {other:?}"),
        }
        assert_eq!(mock.mutation_count(), 0);
    }

    #[test]
    fn test_update_keeping_own_name_is_not_a_collision() {
        let mock = db_clusters();
        let engine = Reconciler::new(&mock, fast_options());
        let request = ReconcileRequest::new(
            Intent::Update,
            DesiredState::new().with("name", "db-prod"),
        )
        .with_identifier("A1");

        let result = engine.reconcile(&request).unwrap();
        assert!(!result.changed);
        assert_eq!(result.action, Action::None);
    }

    #[test]
    fn test_update_missing_is_noop() {
        let mock = MockAdapter::new("cluster");
        let engine = Reconciler::new(&mock, fast_options());
        let request = ReconcileRequest::new(Intent::Update, DesiredState::new().with("name", "x"))
            .with_identifier("nope");

        let result = engine.reconcile(&request).unwrap();
        assert!(!result.changed);
        assert_eq!(mock.mutation_count(), 0);
    }

    #[test]
    fn test_absent_missing_is_noop() {
        let mock = MockAdapter::new("cluster");
        let engine = Reconciler::new(&mock, fast_options());
        let request =
            ReconcileRequest::new(Intent::Absent, DesiredState::new()).with_identifier("nonexistent-id");

        let result = engine.reconcile(&request).unwrap();
        assert!(!result.changed);
        assert_eq!(result.action, Action::None);
        assert!(result.resource.is_none());
    }

    #[test]
    fn test_replace_requires_opt_in() {
        let mock = db_clusters();
        let engine = Reconciler::new(&mock, fast_options());
        let request = ReconcileRequest::new(
            Intent::Present,
            DesiredState::new().with("name", "db-prod").with("location", "us/las"),
        );

        let err = engine.reconcile(&request).unwrap_err();

        assert!(matches!(err.error, Error::ReplacementNotAllowed { .. }));
        assert_eq!(err.action, Action::Create);
        assert_eq!(mock.mutation_count(), 0);
        assert_eq!(mock.objects()[0].id(), Some("A1"));
    }

    #[test]
    fn test_replace_creates_then_deletes() {
        let mock = db_clusters();
        let options = ReconcileOptions {
            allow_replace: true,
            ..fast_options()
        };
        let engine = Reconciler::new(&mock, options);
        let request = ReconcileRequest::new(
            Intent::Present,
            DesiredState::new().with("location", "us/las"),
        )
        .with_identifier("db-prod");

        let result = engine.reconcile(&request).unwrap();

        assert!(result.changed);
        assert_eq!(result.action, Action::Create);
        assert_eq!(result.replaced_id.as_deref(), Some("A1"));
        let calls = mock.calls();
        let create_at = calls.iter().position(|c| c == "create").unwrap();
        let delete_at = calls.iter().position(|c| c == "delete").unwrap();
        assert!(create_at < delete_at);

        let objects = mock.objects();
        assert_eq!(objects.len(), 1);
        assert_ne!(objects[0].id(), Some("A1"));
        assert_eq!(objects[0].as_value()["properties"]["name"], "db-prod");
        assert_eq!(objects[0].as_value()["properties"]["location"], "us/las");
    }

    fn relocate_options() -> ReconcileOptions {
        ReconcileOptions {
            allow_replace: true,
            ..fast_options()
        }
    }

    #[test]
    fn test_update_intent_replaces_when_allowed() {
        let mock = db_clusters();
        let engine = Reconciler::new(&mock, relocate_options());
        let request = ReconcileRequest::new(
            Intent::Update,
            DesiredState::new().with("location", "us/las"),
        )
        .with_identifier("A1");

        let result = engine.reconcile(&request).unwrap();

        assert_eq!(result.action, Action::Create);
        assert_eq!(result.replaced_id.as_deref(), Some("A1"));
        let objects = mock.objects();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].as_value()["properties"]["name"], "db-prod");
        assert_eq!(objects[0].as_value()["properties"]["location"], "us/las");
    }

    #[test]
    fn test_replace_tolerates_original_already_gone() {
        let request = ReconcileRequest::new(
            Intent::Present,
            DesiredState::new().with("location", "us/las"),
        )
        .with_identifier("A1");
        let mock = db_clusters();
        mock.fail_next("delete", AdapterError::not_found("cluster A1"));
        let engine = Reconciler::new(&mock, relocate_options());

        let result = engine.reconcile(&request).unwrap();
        assert!(result.changed);
        assert_eq!(result.replaced_id.as_deref(), Some("A1"));
        assert!(result.warnings.is_empty());
        assert!(mock.calls().contains(&"delete".to_string()));
    }

    #[test]
    fn test_replace_keeps_original_when_replacement_fails() {
        let mock = db_clusters().with_wait(MockWait::Request);
        mock.script_requests([Probe::Failed {
            message: "no capacity in us/las".to_string(),
        }]);
        let engine = Reconciler::new(&mock, relocate_options());
        let request = ReconcileRequest::new(
            Intent::Present,
            DesiredState::new().with("location", "us/las"),
        )
        .with_identifier("A1");

        let err = engine.reconcile(&request).unwrap_err();

        assert_eq!(err.action, Action::Create);
        assert!(matches!(err.error, Error::OperationFailed { .. }));
        assert!(!mock.calls().contains(&"delete".to_string()));
        assert!(mock.objects().iter().any(|o| o.id() == Some("A1")));
    }

    #[test]
    fn test_replace_keeps_original_when_replacement_times_out() {
        let mock = db_clusters().with_wait(MockWait::State);
        let options = ReconcileOptions {
            wait_timeout: Duration::from_millis(20),
            ..relocate_options()
        };
        let engine = Reconciler::new(&mock, options);
        let request = ReconcileRequest::new(
            Intent::Present,
            DesiredState::new().with("location", "us/las"),
        )
        .with_identifier("A1");

        let result = engine.reconcile(&request).unwrap();

        assert!(result.changed);
        assert_eq!(result.action, Action::Create);
        assert_eq!(result.replaced_id, None);
        assert_eq!(result.warnings.len(), 2);
        assert!(result.warnings[0].contains("timed out"));
        assert!(result.warnings[1].starts_with("kept cluster A1"));
        assert!(!mock.calls().contains(&"delete".to_string()));
        let ids: Vec<_> = mock.objects().iter().filter_map(|o| o.id().map(str::to_string)).collect();
        assert_eq!(ids, vec!["A1", "cluster-1"]);
    }

    #[test]
    fn test_result_is_reread_after_wait() {
        let mock = MockAdapter::new("cluster").with_wait(MockWait::Request);
        mock.script_requests([Probe::Pending, Probe::Done]);
        let engine = Reconciler::new(&mock, fast_options());

        let result = engine.reconcile(&present("db-prod")).unwrap();

        assert_eq!(result.resource.unwrap().state(), Some("AVAILABLE"));
        assert_eq!(mock.calls().last().map(String::as_str), Some("list"));
    }

    #[test]
    fn test_result_without_wait_is_the_response() {
        let mock = MockAdapter::new("cluster").with_wait(MockWait::Request);
        let options = ReconcileOptions {
            wait: false,
            ..fast_options()
        };
        let engine = Reconciler::new(&mock, options);

        let result = engine.reconcile(&present("db-prod")).unwrap();

        assert_eq!(result.resource.unwrap().state(), Some("BUSY"));
        assert_eq!(mock.calls().last().map(String::as_str), Some("create"));
    }

    #[test]
    fn test_rename_to_another_objects_id_is_allowed() {
        let mock = db_clusters().with_object("B2", json!({"name": "db-staging"}));
        let engine = Reconciler::new(&mock, fast_options());
        let request = ReconcileRequest::new(Intent::Update, DesiredState::new().with("name", "B2"))
            .with_identifier("A1");

        let result = engine.reconcile(&request).unwrap();

        assert_eq!(result.action, Action::Update);
        assert_eq!(result.resource.unwrap().as_value()["properties"]["name"], "B2");
    }

    #[test]
    fn test_rename_onto_shared_name_is_collision() {
        let mock = db_clusters()
            .with_object("B2", json!({"name": "db-staging"}))
            .with_object("C3", json!({"name": "db-staging"}));
        let engine = Reconciler::new(&mock, fast_options());
        let request = ReconcileRequest::new(
            Intent::Update,
            DesiredState::new().with("name", "db-staging"),
        )
        .with_identifier("A1");

        let err = engine.reconcile(&request).unwrap_err();

        match err.error {
            Error::NameCollision { existing_id, .. } => assert_eq!(existing_id, "B2"),
            other => panic!("Expected NameCollision, got {other:?}"),
        }
        assert_eq!(mock.mutation_count(), 0);
    }

    #[test]
    fn test_missing_required_parameter() {
        let mock = MockAdapter::new("datacenter").with_required_present(&["location"]);
        let engine = Reconciler::new(&mock, fast_options());
        let request = ReconcileRequest::new(Intent::Present, DesiredState::new().with("name", "dc"));

        let err = engine.reconcile(&request).unwrap_err();
        assert!(matches!(err.error, Error::MissingParameter { ref field, .. } if field == "location"));
        assert!(mock.calls().is_empty());
    }

    #[test]
    fn test_missing_identifier() {
        let mock = MockAdapter::new("lan");
        let engine = Reconciler::new(&mock, fast_options());
        let request = ReconcileRequest::new(Intent::Absent, DesiredState::new());

        let err = engine.reconcile(&request).unwrap_err();
        assert!(matches!(err.error, Error::MissingIdentifier { .. }));
        assert_eq!(err.action, Action::Delete);
    }

    #[test]
    fn test_ambiguous_lookup_fails_without_mutation() {
        let mock = MockAdapter::new("server")
            .with_object("A1", json!({"name": "web"}))
            .with_object("B2", json!({"name": "web"}));
        let engine = Reconciler::new(&mock, fast_options());
        let request = ReconcileRequest::new(Intent::Absent, DesiredState::new()).with_identifier("web");

        let err = engine.reconcile(&request).unwrap_err();
        assert!(matches!(err.error, Error::AmbiguousMatch { count: 2, .. }));
        assert_eq!(mock.mutation_count(), 0);
    }

    #[test]
    fn test_api_failure_keeps_action() {
        let mock = MockAdapter::new("cluster");
        mock.fail_next(
            "create",
            AdapterError::Api {
                status: 422,
                message: "invalid location".to_string(),
            },
        );
        let engine = Reconciler::new(&mock, fast_options());

        let err = engine.reconcile(&present("db-prod")).unwrap_err();
        assert_eq!(err.action, Action::Create);
        assert!(err.to_string().contains("invalid location"));
        assert!(err.to_string().starts_with("failed to create the cluster"));
    }

    #[test]
    fn test_delete_not_found_is_noop() {
        let mock = db_clusters();
        mock.fail_next("delete", AdapterError::not_found("cluster A1"));
        let engine = Reconciler::new(&mock, fast_options());
        let request = ReconcileRequest::new(Intent::Absent, DesiredState::new()).with_identifier("A1");

        let result = engine.reconcile(&request).unwrap();
        assert!(!result.changed);
    }

    #[test]
    fn test_update_not_found_is_noop() {
        let mock = db_clusters();
        mock.fail_next("update", AdapterError::not_found("cluster A1"));
        let engine = Reconciler::new(&mock, fast_options());
        let request = ReconcileRequest::new(Intent::Update, DesiredState::new().with("name", "x"))
            .with_identifier("A1");

        let result = engine.reconcile(&request).unwrap();
        assert!(!result.changed);
    }

    #[test]
    fn test_waits_on_request_handle() {
        let mock = MockAdapter::new("lan").with_wait(MockWait::Request);
        mock.script_requests([Probe::Pending, Probe::Pending, Probe::Done]);
        let engine = Reconciler::new(&mock, fast_options());

        let result = engine.reconcile(&present("lan-1")).unwrap();
        assert!(result.warnings.is_empty());
        let probes = mock.calls().iter().filter(|c| *c == "request_status").count();
        assert_eq!(probes, 3);
    }

    #[test]
    fn test_no_wait_skips_polling() {
        let mock = MockAdapter::new("lan").with_wait(MockWait::Request);
        let options = ReconcileOptions {
            wait: false,
            ..fast_options()
        };
        let engine = Reconciler::new(&mock, options);

        engine.reconcile(&present("lan-1")).unwrap();
        assert!(!mock.calls().contains(&"request_status".to_string()));
    }

    #[test]
    fn test_remote_failure_is_operation_failed() {
        let mock = MockAdapter::new("lan").with_wait(MockWait::Request);
        mock.script_requests([Probe::Failed {
            message: "quota exceeded".to_string(),
        }]);
        let engine = Reconciler::new(&mock, fast_options());

        let err = engine.reconcile(&present("lan-1")).unwrap_err();
        assert_eq!(err.action, Action::Create);
        assert!(matches!(err.error, Error::OperationFailed { .. }));
    }

    #[test]
    fn test_wait_timeout_is_success_with_warning() {
        // State-style handles stay BUSY forever in the mock
        let mock = MockAdapter::new("nodepool").with_wait(MockWait::State);
        let options = ReconcileOptions {
            wait_timeout: Duration::from_millis(20),
            ..fast_options()
        };
        let engine = Reconciler::new(&mock, options);

        let result = engine.reconcile(&present("pool")).unwrap();

        assert!(result.changed);
        assert_eq!(result.action, Action::Create);
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("timed out"));
        assert_eq!(mock.objects().len(), 1);
    }

    #[test]
    fn test_delete_waits_until_gone() {
        let mock = db_clusters().with_wait(MockWait::State);
        let engine = Reconciler::new(&mock, fast_options());
        let request = ReconcileRequest::new(Intent::Absent, DesiredState::new()).with_identifier("db-prod");

        let result = engine.reconcile(&request).unwrap();
        assert!(result.changed);
        assert!(result.warnings.is_empty());
        // lookup list, delete, then at least one probe listing
        let calls = mock.calls();
        assert_eq!(calls[0], "list");
        assert_eq!(calls[1], "delete");
        assert_eq!(calls[2], "list");
    }

    #[test]
    fn test_not_found_during_delete_wait_is_success() {
        let mock = db_clusters().with_wait(MockWait::Request);
        mock.script_requests([Probe::Pending]);
        let engine = Reconciler::new(&mock, fast_options());
        mock.fail_next("request_status", AdapterError::not_found("request"));

        let request = ReconcileRequest::new(Intent::Absent, DesiredState::new()).with_identifier("A1");
        let result = engine.reconcile(&request).unwrap();
        assert!(result.changed);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_plan_does_not_mutate() {
        let mock = db_clusters();
        let engine = Reconciler::new(&mock, fast_options());
        let request = ReconcileRequest::new(Intent::Absent, DesiredState::new()).with_identifier("A1");

        let plan = engine.plan(&request).unwrap();
        assert!(matches!(plan, Plan::Delete { .. }));
        assert_eq!(plan.action(), Action::Delete);
        assert!(plan.preview().changed);
        assert_eq!(mock.mutation_count(), 0);
    }

    #[test]
    fn test_failing_update_adapter_flag() {
        #[derive(Debug)]
        struct Strict(MockAdapter);
        impl ResourceAdapter for Strict {
            fn kind(&self) -> &'static str {
                self.0.kind()
            }
            fn identity(&self) -> &crate::identity::ResourceIdentity {
                self.0.identity()
            }
            fn fail_on_missing_update(&self) -> bool {
                true
            }
            fn list(&self) -> Result<Vec<ResourceSummary>, AdapterError> {
                self.0.list()
            }
            fn create(
                &self,
                desired: &DesiredState,
                existing: Option<&ResourceSummary>,
            ) -> Result<crate::adapter::Mutation, AdapterError> {
                self.0.create(desired, existing)
            }
            fn update(
                &self,
                existing: &ResourceSummary,
                desired: &DesiredState,
            ) -> Result<crate::adapter::Mutation, AdapterError> {
                self.0.update(existing, desired)
            }
            fn delete(&self, existing: &ResourceSummary) -> Result<Option<OperationHandle>, AdapterError> {
                self.0.delete(existing)
            }
            fn should_replace(&self, existing: &ResourceSummary, desired: &DesiredState) -> bool {
                self.0.should_replace(existing, desired)
            }
            fn should_update(&self, existing: &ResourceSummary, desired: &DesiredState) -> bool {
                self.0.should_update(existing, desired)
            }
        }

        let strict = Strict(MockAdapter::new("user"));
        let engine = Reconciler::new(&strict, fast_options());
        let request = ReconcileRequest::new(Intent::Update, DesiredState::new()).with_identifier("ghost");

        let err = engine.reconcile(&request).unwrap_err();
        assert!(matches!(err.error, Error::NotFound { .. }));
    }
}

use std::sync::Arc;

use percent_encoding::percent_decode_str;
use tracing::{debug, info};

use crate::action::Action;
use crate::dispatch::dispatch;
use crate::error::RequestError;
use crate::filter::{FilterEngine, QueryDescription};
use crate::params::ParameterSet;
use crate::registry::ActionLookup;
use crate::types::{Envelope, Target};

/// Path segment index of the action name: `/v1/actions/<name>`.
const ACTION_SEGMENT: usize = 2;

// ---------------------------------------------------------------------------
// ActionRequest
// ---------------------------------------------------------------------------

/// A transport-independent view of one incoming request.
#[derive(Debug, Clone)]
pub struct ActionRequest {
    pub method: String,
    pub segments: Vec<String>,
    pub params: ParameterSet,
    pub verbose: bool,
}

impl ActionRequest {
    /// Build a request from a raw, percent-encoded URL path. Verbose mode is
    /// on when `default_verbose` is set or the `verbose` parameter is truthy.
    pub fn new(
        method: impl Into<String>,
        path: &str,
        params: ParameterSet,
        default_verbose: bool,
    ) -> Self {
        let segments = path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| percent_decode_str(s).decode_utf8_lossy().into_owned())
            .collect();
        Self::from_segments(method, segments, params, default_verbose)
    }

    /// A `POST /v1/actions/<name>` request for an already-decoded name.
    pub fn post(action: &str, params: ParameterSet, default_verbose: bool) -> Self {
        let segments = vec!["v1".to_string(), "actions".to_string(), action.to_string()];
        Self::from_segments("POST", segments, params, default_verbose)
    }

    fn from_segments(
        method: impl Into<String>,
        segments: Vec<String>,
        params: ParameterSet,
        default_verbose: bool,
    ) -> Self {
        let verbose = default_verbose || params.is_truthy("verbose");
        Self {
            method: method.into(),
            segments,
            params,
            verbose,
        }
    }
}

// ---------------------------------------------------------------------------
// ActionsEndpoint
// ---------------------------------------------------------------------------

/// The batch dispatch pipeline: validate, resolve the action, resolve its
/// targets, then dispatch. Only the first three stages can fail a request;
/// once dispatch starts the request always produces an envelope.
pub struct ActionsEndpoint {
    registry: Arc<dyn ActionLookup>,
    filter: Arc<dyn FilterEngine>,
    workers: usize,
}

impl ActionsEndpoint {
    pub fn new(registry: Arc<dyn ActionLookup>, filter: Arc<dyn FilterEngine>) -> Self {
        Self {
            registry,
            filter,
            workers: 1,
        }
    }

    /// Bound on concurrent invocations per request. `1` dispatches
    /// sequentially.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn handle(&self, request: &ActionRequest) -> Result<Envelope, RequestError> {
        let name = validate(request)?;

        let action = self
            .registry
            .resolve(name)
            .ok_or_else(|| RequestError::ActionNotFound(name.to_string()))?;

        let targets = self.resolve_targets(action.as_ref(), request)?;

        info!(action = name, targets = targets.len(), "Running action {name}");
        let envelope = dispatch(
            action.as_ref(),
            &targets,
            &request.params,
            request.verbose,
            self.workers,
        );
        debug!(
            action = name,
            results = envelope.results.len(),
            failures = envelope.failures(),
            "action finished"
        );
        Ok(envelope)
    }

    fn resolve_targets(
        &self,
        action: &dyn Action,
        request: &ActionRequest,
    ) -> Result<Vec<Target>, RequestError> {
        if action.types().is_empty() {
            return Ok(vec![Target::None]);
        }

        let query = QueryDescription::for_types(action.types().iter().cloned());
        self.filter
            .resolve(&query, &request.params)
            .map_err(|err| {
                debug!(action = action.name(), error = %err, "target resolution failed");
                RequestError::InvalidTargets {
                    diagnostic: request.verbose.then(|| err.to_string()),
                }
            })
    }
}

/// Check method and path shape, returning the action name.
pub fn validate(request: &ActionRequest) -> Result<&str, RequestError> {
    if request.method != "POST" {
        return Err(RequestError::InvalidMethod);
    }
    request
        .segments
        .get(ACTION_SEGMENT)
        .map(String::as_str)
        .ok_or(RequestError::MissingAction)
}

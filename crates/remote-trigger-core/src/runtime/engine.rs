// crates/remote-trigger-core/src/runtime/engine.rs
// ============================================================================
// Module: Remote Trigger Engine
// Description: Submit, resolve, poll, and abort remote builds.
// Purpose: Advance the build state machine from remote observations.
// Dependencies: crate::core, crate::interfaces, crate::runtime, serde_json, url
// ============================================================================

//! ## Overview
//! [`RemoteTrigger`] performs every remote interaction. A trigger resolves
//! the server, optionally waits for the remote job to go idle, submits the
//! build, and returns a [`Handle`]. Each later refresh runs one step:
//! queued builds resolve their queue item, running builds poll their status,
//! and finished builds are left alone without any request.
//!
//! Invariants:
//! - Every request carries the server's authorization (or none) and, for
//!   POSTs, a crumb when the server issues them.
//! - A step either commits its state transition completely or not at all.
//! - Transport failures are retried with exponential backoff up to the
//!   configured limit; HTTP error statuses are never retried.
//!
//! Security posture: request URLs in logs, events, and errors have their
//! query string removed so job tokens never leak.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use url::Url;

use crate::core::AuthError;
use crate::core::ExecutionContext;
use crate::core::JobMetadata;
use crate::core::QueueId;
use crate::core::RemoteBuildConfig;
use crate::core::RemoteBuildInfo;
use crate::core::RemoteBuildResult;
use crate::core::RemoteBuildStatus;
use crate::core::RemoteServerDescriptor;
use crate::core::TriggerEvent;
use crate::core::effective_job_url;
use crate::core::evaluate_effective_remote_host;
use crate::interfaces::CredentialStore;
use crate::interfaces::HttpMethod;
use crate::interfaces::HttpRequest;
use crate::interfaces::HttpResponse;
use crate::interfaces::InMemoryCredentialStore;
use crate::interfaces::RemoteTransport;
use crate::interfaces::ServerLookup;
use crate::interfaces::StaticServerLookup;
use crate::runtime::cache::Crumb;
use crate::runtime::cache::CrumbCache;
use crate::runtime::cache::JobInfoCache;
use crate::runtime::cancel::CancelToken;
use crate::runtime::error::TriggerError;
use crate::runtime::gate::ConnectionGate;
use crate::runtime::handle::Handle;
use crate::runtime::protocol::BuildStatusDocument;
use crate::runtime::protocol::CrumbDocument;
use crate::runtime::protocol::JobActivity;
use crate::runtime::protocol::QueueItem;
use crate::runtime::protocol::append_path;
use crate::runtime::protocol::display_url;
use crate::runtime::protocol::form_body;
use crate::runtime::protocol::parse_json;
use crate::runtime::protocol::parse_queue_id;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default upper bound for a single retry backoff.
const DEFAULT_MAX_RETRY_BACKOFF: Duration = Duration::from_secs(60);
/// Content type of submission bodies.
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

// ============================================================================
// SECTION: Target
// ============================================================================

/// Everything a step needs to address one remote build.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Target<'a> {
    /// Build configuration.
    pub(crate) config: &'a RemoteBuildConfig,
    /// Resolved remote server.
    pub(crate) server: &'a RemoteServerDescriptor,
    /// Remote job URL.
    pub(crate) job_url: &'a Url,
}

/// Crumb resolved for one POST, with its provenance.
#[derive(Debug, Clone, Default)]
struct CrumbLookup {
    /// Crumb to send, if the server issues them.
    crumb: Option<Crumb>,
    /// True when the crumb came from the cache.
    from_cache: bool,
}

// ============================================================================
// SECTION: Engine
// ============================================================================

/// Remote build trigger engine.
///
/// # Invariants
/// - `Send + Sync`; share it behind an `Arc` across callers.
/// - The connection gate and caches are shared by every operation.
pub struct RemoteTrigger {
    /// HTTP capability.
    transport: Arc<dyn RemoteTransport>,
    /// Named server registry.
    servers: Arc<dyn ServerLookup>,
    /// Scoped credential store.
    credentials: Arc<dyn CredentialStore>,
    /// Crumbs keyed by server address and identity.
    crumbs: CrumbCache,
    /// Job metadata keyed by job URL.
    job_info: JobInfoCache,
    /// Bound on concurrent outbound requests.
    gate: ConnectionGate,
    /// Upper bound for a single retry backoff.
    max_retry_backoff: Duration,
}

/// Builder for [`RemoteTrigger`].
pub struct RemoteTriggerBuilder {
    /// HTTP capability.
    transport: Arc<dyn RemoteTransport>,
    /// Named server registry.
    servers: Arc<dyn ServerLookup>,
    /// Scoped credential store.
    credentials: Arc<dyn CredentialStore>,
    /// Upper bound for a single retry backoff.
    max_retry_backoff: Duration,
}

impl RemoteTriggerBuilder {
    /// Sets the named server registry.
    #[must_use]
    pub fn servers(mut self, servers: Arc<dyn ServerLookup>) -> Self {
        self.servers = servers;
        self
    }

    /// Sets the credential store.
    #[must_use]
    pub fn credentials(mut self, credentials: Arc<dyn CredentialStore>) -> Self {
        self.credentials = credentials;
        self
    }

    /// Caps a single retry backoff.
    #[must_use]
    pub const fn max_retry_backoff(mut self, max: Duration) -> Self {
        self.max_retry_backoff = max;
        self
    }

    /// Builds the engine.
    #[must_use]
    pub fn build(self) -> RemoteTrigger {
        RemoteTrigger {
            transport: self.transport,
            servers: self.servers,
            credentials: self.credentials,
            crumbs: CrumbCache::new(),
            job_info: JobInfoCache::new(),
            gate: ConnectionGate::new(),
            max_retry_backoff: self.max_retry_backoff,
        }
    }
}

impl RemoteTrigger {
    /// Starts a builder with no named servers and no credentials.
    #[must_use]
    pub fn builder(transport: Arc<dyn RemoteTransport>) -> RemoteTriggerBuilder {
        RemoteTriggerBuilder {
            transport,
            servers: Arc::new(StaticServerLookup::default()),
            credentials: Arc::new(InMemoryCredentialStore::default()),
            max_retry_backoff: DEFAULT_MAX_RETRY_BACKOFF,
        }
    }

    /// Returns the crumb cache.
    #[must_use]
    pub const fn crumb_cache(&self) -> &CrumbCache {
        &self.crumbs
    }

    /// Returns the job metadata cache.
    #[must_use]
    pub const fn job_info_cache(&self) -> &JobInfoCache {
        &self.job_info
    }

    /// Returns the connection gate.
    #[must_use]
    pub const fn connection_gate(&self) -> &ConnectionGate {
        &self.gate
    }

    // ------------------------------------------------------------------------
    // Trigger
    // ------------------------------------------------------------------------

    /// Triggers the remote job described by `config`.
    ///
    /// Returns `Ok(None)` without any request when the configuration is
    /// disabled. When `block_until_complete` is set the call returns after
    /// the remote build finished.
    ///
    /// # Errors
    ///
    /// Returns [`TriggerError`] when resolution, submission, or the blocking
    /// wait fails, and [`TriggerError::RemoteBuildFailed`] when a blocking
    /// trigger observes a non-success result and `should_not_fail_build` is
    /// not set.
    pub fn trigger(
        &self,
        config: RemoteBuildConfig,
        mut context: ExecutionContext<'_>,
        cancel: &CancelToken,
    ) -> Result<Option<Handle>, TriggerError> {
        if config.disabled {
            context.log("The remote trigger is disabled; no build was started.");
            return Ok(None);
        }
        config.validate()?;
        let server = evaluate_effective_remote_host(&config, self.servers.as_ref())?;
        let job_url = effective_job_url(&config, &server)?;
        let target = Target {
            config: &config,
            server: &server,
            job_url: &job_url,
        };
        let auth = server.auth.describe_for(context.identity(), self.credentials.as_ref());
        context.log(format_args!(
            "Triggering remote job {} on {server} using {auth}",
            display_url(&job_url)
        ));

        let metadata = self.fetch_job_metadata(&target, &mut context, Some(cancel));
        if config.prevent_remote_build_queue {
            self.wait_for_idle(&target, &mut context, cancel)?;
        }

        let queue_id = self.submit(&target, &mut context, Some(cancel))?;
        let mut info = RemoteBuildInfo::new();
        info.set_queued(queue_id)?;
        context.emit(&TriggerEvent::StatusChanged {
            from: RemoteBuildStatus::NotStarted,
            to: RemoteBuildStatus::Queued,
        });

        if config.block_until_complete {
            self.follow(&target, &mut info, &mut context, cancel)?;
        } else {
            context.log("Not blocking; use the returned handle to check the remote build.");
        }

        let identity = context.identity().clone();
        let handle = Handle::new(config, server, job_url, metadata, identity, info);
        if handle.config().block_until_complete
            && let Some(result) = handle.build_result()
            && !result.is_success()
        {
            if handle.config().should_not_fail_build {
                context.log(format_args!(
                    "Remote build finished with status {result}; not failing as configured."
                ));
            } else {
                return Err(TriggerError::RemoteBuildFailed {
                    result,
                    build_url: handle.build_url().map(ToString::to_string),
                });
            }
        }
        Ok(Some(handle))
    }

    // ------------------------------------------------------------------------
    // Steps
    // ------------------------------------------------------------------------

    /// Runs one engine step against `info`.
    ///
    /// Finished (and never submitted) builds are left untouched without any
    /// request. The record is only replaced when the whole step succeeded.
    pub(crate) fn step(
        &self,
        target: &Target<'_>,
        info: &mut RemoteBuildInfo,
        context: &mut ExecutionContext<'_>,
        cancel: Option<&CancelToken>,
    ) -> Result<(), TriggerError> {
        let mut next = info.clone();
        match next.status() {
            RemoteBuildStatus::NotStarted | RemoteBuildStatus::Finished => return Ok(()),
            RemoteBuildStatus::Queued => self.resolve_queue(target, &mut next, context, cancel)?,
            RemoteBuildStatus::Running => self.poll_build(target, &mut next, context, cancel)?,
        }
        let previous = info.status();
        *info = next;
        if info.status() != previous {
            context.emit(&TriggerEvent::StatusChanged {
                from: previous,
                to: info.status(),
            });
        }
        if info.is_finished()
            && previous != RemoteBuildStatus::Finished
            && let Some(result) = info.result()
        {
            context.emit(&TriggerEvent::Finished {
                build_url: info.build_url().map(ToString::to_string),
                result,
            });
            if target.config.enhanced_logging {
                self.echo_console(target, info, context, cancel);
            }
        }
        Ok(())
    }

    /// Steps until the build finishes, sleeping the poll interval between
    /// steps. Cancellation is observed before every step.
    pub(crate) fn follow(
        &self,
        target: &Target<'_>,
        info: &mut RemoteBuildInfo,
        context: &mut ExecutionContext<'_>,
        cancel: &CancelToken,
    ) -> Result<(), TriggerError> {
        loop {
            if cancel.is_cancelled() {
                context.log("Waiting for the remote build was interrupted.");
                if target.config.abort_on_cancel {
                    self.abort(target, info, context, cancel);
                }
                return Err(TriggerError::Interrupted);
            }
            if let Err(err) = self.step(target, info, context, Some(cancel)) {
                if cancel.is_cancelled() {
                    continue;
                }
                return Err(err);
            }
            if info.is_finished() {
                return Ok(());
            }
            cancel.wait_timeout(target.config.poll_interval());
        }
    }

    /// Resolves a queue item into a running build, a cancellation, or a
    /// continued wait.
    fn resolve_queue(
        &self,
        target: &Target<'_>,
        info: &mut RemoteBuildInfo,
        context: &mut ExecutionContext<'_>,
        cancel: Option<&CancelToken>,
    ) -> Result<(), TriggerError> {
        let Some(queue_id) = info.queue_id().cloned() else {
            return Err(TriggerError::RemoteProtocol("queued build has no queue id".to_string()));
        };
        let server_url = target.server.address_url()?;
        let url = append_path(&server_url, &["queue", "item", queue_id.as_str(), "api", "json"]);
        let response = self.get(target, url.clone(), context, cancel)?;
        let response = expect_success(response, &url)?;
        let item: QueueItem = parse_json(&response, "queue item")?;

        if let Some(executable) = item.executable {
            let build_url = Url::parse(executable.url.trim()).map_err(|err| {
                TriggerError::RemoteProtocol(format!(
                    "invalid build url '{}' in queue item {queue_id}: {err}",
                    executable.url
                ))
            })?;
            info.set_running(executable.number, build_url)?;
            context.log(format_args!(
                "Remote build started: #{} {}",
                executable.number,
                executable.url.trim()
            ));
        } else if item.cancelled {
            info.set_finished(RemoteBuildResult::Aborted)?;
            context.log(format_args!("Queue item {queue_id} was cancelled on the remote server."));
        } else {
            let why = item.why.as_deref().map_or("", str::trim);
            context.log(format_args!("Waiting in the remote queue: {why}"));
        }
        Ok(())
    }

    /// Polls a running build once.
    fn poll_build(
        &self,
        target: &Target<'_>,
        info: &mut RemoteBuildInfo,
        context: &mut ExecutionContext<'_>,
        cancel: Option<&CancelToken>,
    ) -> Result<(), TriggerError> {
        let Some(build_url) = info.build_url().cloned() else {
            return Err(TriggerError::RemoteProtocol("running build has no build url".to_string()));
        };
        let mut url = append_path(&build_url, &["api", "json"]);
        url.query_pairs_mut().append_pair("tree", "result,building");
        let response = self.get(target, url.clone(), context, cancel)?;
        let response = expect_success(response, &url)?;
        let status: BuildStatusDocument = parse_json(&response, "build status")?;
        if status.is_complete() {
            let result = RemoteBuildResult::from_remote(status.result.as_deref());
            info.set_finished(result)?;
            context.log(format_args!("Remote build finished with status {result}."));
        } else {
            context.log(format_args!("Remote build running: {build_url}"));
        }
        Ok(())
    }

    /// Echoes the remote console output; failures are logged only.
    fn echo_console(
        &self,
        target: &Target<'_>,
        info: &RemoteBuildInfo,
        context: &mut ExecutionContext<'_>,
        cancel: Option<&CancelToken>,
    ) {
        let Some(build_url) = info.build_url() else {
            return;
        };
        let url = append_path(build_url, &["consoleText"]);
        match self.get(target, url.clone(), context, cancel).and_then(|r| expect_success(r, &url)) {
            Ok(response) => {
                context.log("--------------------------------------------------------------------------------");
                context.log(format_args!("Console output of remote build {build_url}:"));
                context.log_raw(&response.body_text());
                context.log("--------------------------------------------------------------------------------");
            }
            Err(err) => context.log(format_args!("Could not fetch remote console output: {err}")),
        }
    }

    /// Best-effort abort of a queued or running build. Never fails.
    ///
    /// `cancel` is already fired, so every request gets a single attempt.
    pub(crate) fn abort(
        &self,
        target: &Target<'_>,
        info: &RemoteBuildInfo,
        context: &mut ExecutionContext<'_>,
        cancel: &CancelToken,
    ) {
        let url = match info.status() {
            RemoteBuildStatus::Queued => {
                let (Ok(server_url), Some(queue_id)) = (target.server.address_url(), info.queue_id())
                else {
                    return;
                };
                let mut url = append_path(&server_url, &["queue", "cancelItem"]);
                url.query_pairs_mut().append_pair("id", queue_id.as_str());
                url
            }
            RemoteBuildStatus::Running => match info.build_url() {
                Some(build_url) => append_path(build_url, &["stop"]),
                None => return,
            },
            RemoteBuildStatus::NotStarted | RemoteBuildStatus::Finished => return,
        };
        let shown = url.to_string();
        let acknowledged = match self.post(target, url, None, context, Some(cancel)) {
            Ok(response) => response.status < 400,
            Err(err) => {
                context.log(format_args!("Could not abort remote build: {err}"));
                false
            }
        };
        if acknowledged {
            context.log(format_args!("Requested abort of remote build via {shown}"));
        }
        context.emit(&TriggerEvent::AbortRequested {
            url: shown,
            acknowledged,
        });
    }

    // ------------------------------------------------------------------------
    // Submission
    // ------------------------------------------------------------------------

    /// Submits the build and returns its queue reference.
    fn submit(
        &self,
        target: &Target<'_>,
        context: &mut ExecutionContext<'_>,
        cancel: Option<&CancelToken>,
    ) -> Result<QueueId, TriggerError> {
        let parameters = &target.config.parameters;
        let endpoint = if parameters.is_empty() { "build" } else { "buildWithParameters" };
        let mut url = append_path(target.job_url, &[endpoint]);
        {
            let mut query = url.query_pairs_mut();
            if let Some(token) =
                target.config.job_token.as_deref().map(str::trim).filter(|t| !t.is_empty())
            {
                query.append_pair("token", token);
            }
            query.append_pair("delay", "0sec");
        }
        let body = form_body(parameters);
        let response = self.post(target, url.clone(), Some(body), context, cancel)?;
        let response = expect_success(response, &url)?;
        let queue_id = parse_queue_id(&response).ok_or_else(|| {
            TriggerError::RemoteProtocol(format!(
                "no queue reference in response from {}",
                display_url(&url)
            ))
        })?;
        context.log(format_args!("Remote build queued with queue id {queue_id}."));
        context.emit(&TriggerEvent::Submitted {
            job_url: display_url(target.job_url),
            queue_id: queue_id.clone(),
        });
        Ok(queue_id)
    }

    /// Waits until the remote job is neither queued nor building.
    fn wait_for_idle(
        &self,
        target: &Target<'_>,
        context: &mut ExecutionContext<'_>,
        cancel: &CancelToken,
    ) -> Result<(), TriggerError> {
        let url = append_path(target.job_url, &["api", "json"]);
        loop {
            if cancel.is_cancelled() {
                return Err(TriggerError::Interrupted);
            }
            let response = self.get(target, url.clone(), context, Some(cancel))?;
            let response = expect_success(response, &url)?;
            let activity: JobActivity = parse_json(&response, "job")?;
            if activity.is_idle() {
                return Ok(());
            }
            context.log(format_args!(
                "Remote job is busy; waiting {}s before checking again.",
                target.config.poll_interval_secs
            ));
            if cancel.wait_timeout(target.config.poll_interval()) {
                return Err(TriggerError::Interrupted);
            }
        }
    }

    /// Fetches job metadata, consulting the cache when enabled.
    ///
    /// Failures are logged and yield empty metadata.
    fn fetch_job_metadata(
        &self,
        target: &Target<'_>,
        context: &mut ExecutionContext<'_>,
        cancel: Option<&CancelToken>,
    ) -> JobMetadata {
        let key = display_url(target.job_url);
        if target.config.use_job_info_cache
            && let Some(cached) = self.job_info.get(&key)
        {
            return cached;
        }
        let url = append_path(target.job_url, &["api", "json"]);
        let fetched = self
            .get(target, url.clone(), context, cancel)
            .and_then(|response| expect_success(response, &url))
            .and_then(|response| parse_json::<serde_json::Value>(&response, "job"));
        match fetched {
            Ok(document) => {
                let metadata = JobMetadata::from_json(&document);
                if target.config.use_job_info_cache {
                    self.job_info.insert(&key, metadata.clone());
                }
                metadata
            }
            Err(err) => {
                context.log(format_args!("Could not fetch remote job metadata: {err}"));
                JobMetadata::default()
            }
        }
    }

    /// Reads a JSON artifact of the build.
    ///
    /// Returns `None` for a blank path, a build without URL, or a missing
    /// artifact.
    pub(crate) fn read_artifact(
        &self,
        target: &Target<'_>,
        info: &RemoteBuildInfo,
        path: &str,
        context: &mut ExecutionContext<'_>,
    ) -> Result<Option<serde_json::Value>, TriggerError> {
        let path = path.trim().trim_matches('/');
        if path.is_empty() {
            return Ok(None);
        }
        let Some(build_url) = info.build_url() else {
            return Ok(None);
        };
        let mut segments = vec!["artifact"];
        segments.extend(path.split('/').filter(|segment| !segment.is_empty()));
        let url = append_path(build_url, &segments);
        let response = self.get(target, url.clone(), context, None)?;
        if response.status == 404 {
            context.log(format_args!("Artifact '{path}' not found on the remote build."));
            return Ok(None);
        }
        let response = expect_success(response, &url)?;
        parse_json(&response, "artifact").map(Some)
    }

    // ------------------------------------------------------------------------
    // Requests
    // ------------------------------------------------------------------------

    /// Sends an authorized GET.
    fn get(
        &self,
        target: &Target<'_>,
        url: Url,
        context: &mut ExecutionContext<'_>,
        cancel: Option<&CancelToken>,
    ) -> Result<HttpResponse, TriggerError> {
        let mut request = HttpRequest::new(HttpMethod::Get, url);
        target.server.auth.apply(&mut request, context, self.credentials.as_ref())?;
        let response = self.execute(target, &request, context, cancel)?;
        check_authorized(response, &request.url)
    }

    /// Sends an authorized POST with a crumb; a 403 after a cached crumb
    /// refreshes the crumb and retries once.
    fn post(
        &self,
        target: &Target<'_>,
        url: Url,
        body: Option<Vec<u8>>,
        context: &mut ExecutionContext<'_>,
        cancel: Option<&CancelToken>,
    ) -> Result<HttpResponse, TriggerError> {
        let mut request = HttpRequest::new(HttpMethod::Post, url);
        if let Some(body) = body {
            request = request.with_body(FORM_CONTENT_TYPE, body);
        }
        target.server.auth.apply(&mut request, context, self.credentials.as_ref())?;
        let lookup = self.crumb(target, context, cancel)?;
        apply_crumb(&mut request, lookup.crumb.as_ref());
        let response = self.execute(target, &request, context, cancel)?;
        if response.status != 403 || !lookup.from_cache {
            return check_authorized(response, &request.url);
        }

        let address = target.server.address_url()?.to_string();
        self.crumbs.invalidate(&address, context.identity().as_str());
        context.log("Cached crumb was rejected; fetching a new one.");
        context.emit(&TriggerEvent::CrumbRefreshed {
            server: address,
        });
        let fresh = self.crumb(target, context, cancel)?;
        if let Some(previous) = &lookup.crumb {
            request.remove_header(&previous.field);
        }
        apply_crumb(&mut request, fresh.crumb.as_ref());
        let response = self.execute(target, &request, context, cancel)?;
        check_authorized(response, &request.url)
    }

    /// Resolves the crumb for the target server and identity.
    fn crumb(
        &self,
        target: &Target<'_>,
        context: &mut ExecutionContext<'_>,
        cancel: Option<&CancelToken>,
    ) -> Result<CrumbLookup, TriggerError> {
        let server_url = target.server.address_url()?;
        let address = server_url.to_string();
        let identity = context.identity().as_str().to_string();
        if target.config.use_crumb_cache
            && let Some(crumb) = self.crumbs.get(&address, &identity)
        {
            return Ok(CrumbLookup {
                crumb,
                from_cache: true,
            });
        }
        let url = append_path(&server_url, &["crumbIssuer", "api", "json"]);
        let response = self.get(target, url.clone(), context, cancel)?;
        let crumb = if response.status == 404 {
            None
        } else {
            let response = expect_success(response, &url)?;
            let document: CrumbDocument = parse_json(&response, "crumb")?;
            Some(Crumb {
                field: document.crumb_request_field,
                value: document.crumb,
            })
        };
        if target.config.use_crumb_cache {
            self.crumbs.insert(&address, &identity, crumb.clone());
        }
        Ok(CrumbLookup {
            crumb,
            from_cache: false,
        })
    }

    /// Executes a request through the gate, retrying transport failures.
    fn execute(
        &self,
        target: &Target<'_>,
        request: &HttpRequest,
        context: &mut ExecutionContext<'_>,
        cancel: Option<&CancelToken>,
    ) -> Result<HttpResponse, TriggerError> {
        let limit = target.config.connection_retry_limit;
        let mut backoff = target.config.retry_backoff();
        let mut attempt: u32 = 1;
        loop {
            let outcome = {
                let _permit = self.gate.acquire(target.config.max_connections);
                self.transport.execute(request)
            };
            let error = match outcome {
                Ok(response) => return Ok(response),
                Err(error) => error,
            };
            let url = display_url(&request.url);
            let cancelled = cancel.is_some_and(CancelToken::is_cancelled);
            if !error.is_retryable() || attempt > limit || cancelled {
                return Err(TriggerError::Transport {
                    url,
                    attempts: attempt,
                    source: error,
                });
            }
            context.log(format_args!(
                "Connection to {url} failed ({error}); retry {attempt} of {limit} in {}ms.",
                backoff.as_millis()
            ));
            context.emit(&TriggerEvent::Retry {
                url,
                attempt,
                error: error.to_string(),
            });
            match cancel {
                Some(token) => {
                    if token.wait_timeout(backoff) {
                        return Err(TriggerError::Interrupted);
                    }
                }
                None => thread::sleep(backoff),
            }
            backoff = backoff.saturating_mul(2).min(self.max_retry_backoff);
            attempt = attempt.saturating_add(1);
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Sets the crumb header when a crumb is present.
fn apply_crumb(request: &mut HttpRequest, crumb: Option<&Crumb>) {
    if let Some(crumb) = crumb {
        request.set_header(&crumb.field, crumb.value.clone());
    }
}

/// Maps 401 and 403 to [`AuthError::Rejected`].
fn check_authorized(response: HttpResponse, url: &Url) -> Result<HttpResponse, TriggerError> {
    if matches!(response.status, 401 | 403) {
        return Err(AuthError::Rejected {
            status: response.status,
            url: display_url(url),
        }
        .into());
    }
    Ok(response)
}

/// Maps non-2xx statuses to [`TriggerError::RemoteRejected`].
fn expect_success(response: HttpResponse, url: &Url) -> Result<HttpResponse, TriggerError> {
    if response.is_success() {
        return Ok(response);
    }
    Err(TriggerError::RemoteRejected {
        status: response.status,
        url: display_url(url),
    })
}

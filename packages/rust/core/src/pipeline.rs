//! Adaptive request orchestration.
//!
//! A [`DataQuery`] names one or more datasets, area pairs and time windows.
//! Every (dataset, pair, window) combination is one logical request
//! driven through [`RequestState`]. A rejection that advertises a range limit
//! splits the window and re-issues the pieces, once. Successful tables are
//! merged into one; failures are collected beside it as data.

use std::sync::Arc;
use std::time::Instant;

use chrono::{NaiveDateTime, Utc};
use entsoe_flatten::{Document, Flattener, extract_reason};
use entsoe_resolver::{FuzzyMatch, Remapper, Resolver};
use entsoe_shared::{
    Catalog, Cell, ClientConfig, DatasetDescriptor, EntsoeError, Record, Result, Scalar, Table,
    TimeInterval,
};
use tracing::{debug, info, instrument, warn};

use crate::archive;
use crate::merge::{DEFAULT_EXTENDS, merge_rows};
use crate::pairs::{AreaPair, expand_pairs};
use crate::params::{RequestParams, fill_parameters};
use crate::ratelimit::CallLimiter;
use crate::split::{RangeLimit, split_interval};
use crate::timestamps::add_sample_timestamps;
use crate::transport::{FetchResponse, HttpTransport, Transport};
use crate::window::TimeWindow;

/// Leading columns of every result row.
pub const DATASET_COLUMN: &str = "dataset";
pub const SUCCESS_COLUMN: &str = "success";
pub const PARAMETERS_COLUMN: &str = "parameters";
pub const REASON_COLUMN: &str = "reason";

// ---------------------------------------------------------------------------
// Query input
// ---------------------------------------------------------------------------

/// An origin area and optional destination area, as free text or codes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AreaQuery {
    pub origin: String,
    pub destination: Option<String>,
}

impl AreaQuery {
    pub fn new(origin: impl Into<String>, destination: Option<&str>) -> Self {
        Self {
            origin: origin.into(),
            destination: destination.map(str::to_string),
        }
    }
}

/// Input to [`EntsoeClient::get_data`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataQuery {
    /// Free-text dataset names, each fuzzy-matched against the catalog.
    pub datasets: Vec<String>,
    pub areas: Vec<AreaQuery>,
    /// Requested windows; none means one default window.
    pub windows: Vec<TimeWindow>,
}

impl DataQuery {
    pub fn new(dataset: impl Into<String>) -> Self {
        Self {
            datasets: vec![dataset.into()],
            areas: Vec::new(),
            windows: Vec::new(),
        }
    }

    pub fn dataset(mut self, dataset: impl Into<String>) -> Self {
        self.datasets.push(dataset.into());
        self
    }

    pub fn area(mut self, origin: impl Into<String>, destination: Option<&str>) -> Self {
        self.areas.push(AreaQuery::new(origin, destination));
        self
    }

    pub fn window(mut self, start: Option<&str>, end: Option<&str>) -> Self {
        self.windows.push(TimeWindow::new(start, end));
        self
    }
}

// ---------------------------------------------------------------------------
// Query output
// ---------------------------------------------------------------------------

/// One failed request, kept as data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub dataset: String,
    pub parameters: String,
    pub reason: String,
}

/// Merged successes plus every failure of one query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub failures: Vec<Failure>,
    /// Successful rows after merging, singleton lists unwrapped.
    pub table: Table,
}

impl QueryResult {
    /// True when no request failed.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Single-table view: one aggregate failure row listing every failure,
    /// followed by the merged success rows.
    pub fn to_table(&self) -> Table {
        let mut out = Table::with_columns([
            DATASET_COLUMN,
            SUCCESS_COLUMN,
            PARAMETERS_COLUMN,
            REASON_COLUMN,
        ]);
        if !self.failures.is_empty() {
            let list = |f: fn(&Failure) -> &str| {
                Cell::Sequence(self.failures.iter().map(|x| Scalar::from(f(x))).collect())
            };
            out.push(
                Record::new()
                    .with(DATASET_COLUMN, list(|f| &f.dataset))
                    .with(
                        SUCCESS_COLUMN,
                        Cell::Sequence(vec![Scalar::Bool(false); self.failures.len()]),
                    )
                    .with(PARAMETERS_COLUMN, list(|f| &f.parameters))
                    .with(REASON_COLUMN, list(|f| &f.reason)),
            );
        }
        out.extend(self.table.clone());
        out.map_cells(Cell::unwrap_singleton);
        out
    }
}

// ---------------------------------------------------------------------------
// Request lifecycle
// ---------------------------------------------------------------------------

/// State of one logical request.
///
/// `Pending → Requested → {Success | OversizedRetry → Requested | Failure}`.
/// `OversizedRetry` is entered at most once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Pending,
    Requested,
    Success,
    OversizedRetry,
    Failure,
}

impl RequestState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Failure)
    }
}

#[derive(Debug)]
struct Lifecycle<'a> {
    label: &'a str,
    state: RequestState,
    retried: bool,
}

impl<'a> Lifecycle<'a> {
    fn new(label: &'a str) -> Self {
        Self {
            label,
            state: RequestState::Pending,
            retried: false,
        }
    }

    /// Move to `next`. An illegal transition is refused and returns `false`.
    fn advance(&mut self, next: RequestState) -> bool {
        use RequestState as S;

        let legal = match (self.state, next) {
            (S::Pending | S::OversizedRetry, S::Requested) => true,
            (S::Requested, S::Success | S::Failure) => true,
            (S::Requested, S::OversizedRetry) => !self.retried,
            _ => false,
        };
        if !legal {
            debug!(request = self.label, from = ?self.state, to = ?next, "transition refused");
            return false;
        }
        if next == S::OversizedRetry {
            self.retried = true;
        }
        debug!(request = self.label, from = ?self.state, to = ?next, "request state");
        self.state = next;
        true
    }
}

/// Classified result of one issued request.
#[derive(Debug)]
enum Outcome {
    Success(Table),
    Oversized { limit: RangeLimit, reason: String },
    Failure(String),
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Callback for reporting query progress.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called before a logical request is issued.
    fn request_started(&self, label: &str, current: usize, total: usize);
    /// Called once a logical request reached a terminal state.
    fn request_finished(&self, label: &str, state: RequestState);
    /// Called when the query completes.
    fn done(&self, result: &QueryResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn request_started(&self, _label: &str, _current: usize, _total: usize) {}
    fn request_finished(&self, _label: &str, _state: RequestState) {}
    fn done(&self, _result: &QueryResult) {}
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Entry point for data queries against one catalog.
///
/// Requests are issued one at a time; the rate limiter is the only point
/// where a query waits.
pub struct EntsoeClient {
    catalog: Catalog,
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    limiter: CallLimiter,
}

/// Per-query values shared by every request of that query.
struct Run<'a, 'f> {
    descriptor: &'a DatasetDescriptor,
    api_key: &'a str,
    flattener: &'a Flattener<'f>,
}

impl Run<'_, '_> {
    fn failure(&self, params: &RequestParams, reason: String) -> Failure {
        Failure {
            dataset: self.descriptor.name().to_string(),
            parameters: params.to_string(),
            reason,
        }
    }
}

impl EntsoeClient {
    /// Client over HTTP.
    pub fn new(config: ClientConfig, catalog: Catalog) -> Result<Self> {
        let transport = HttpTransport::new(config.timeout)?;
        Self::with_transport(config, catalog, Arc::new(transport))
    }

    pub fn with_transport(
        config: ClientConfig,
        catalog: Catalog,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        let limiter = CallLimiter::new(config.rate_limit)?;
        Ok(Self {
            catalog,
            config,
            transport,
            limiter,
        })
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn resolver(&self) -> Resolver<'_> {
        Resolver::new(&self.catalog, self.config.matching)
    }

    /// Known areas as `(code, meaning)`.
    pub fn areas(&self) -> Vec<(String, String)> {
        self.resolver()
            .area_table()
            .map(|table| {
                table
                    .entries
                    .iter()
                    .map(|e| (e.code.clone(), e.meaning.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Run a query with windows defaulted relative to the current time.
    pub async fn get_data(
        &self,
        query: &DataQuery,
        progress: &dyn ProgressReporter,
    ) -> Result<QueryResult> {
        self.get_data_at(query, Utc::now().naive_utc(), progress).await
    }

    /// Run a query with windows defaulted relative to `now`.
    ///
    /// Errors only on preconditions: no API key, an empty catalog, no datasets
    /// or areas, a dataset that does not resolve to exactly one entry, or an
    /// invalid window. Everything after that is reported inside the result.
    #[instrument(skip_all, fields(datasets = ?query.datasets))]
    pub async fn get_data_at(
        &self,
        query: &DataQuery,
        now: NaiveDateTime,
        progress: &dyn ProgressReporter,
    ) -> Result<QueryResult> {
        let started = Instant::now();

        // --- Preconditions ---
        progress.phase("Checking preconditions");
        let api_key = self.config.api_key.as_deref().ok_or_else(|| {
            EntsoeError::precondition("no API key configured; set the security token variable")
        })?;
        if self.catalog.is_empty() {
            return Err(EntsoeError::precondition(
                "catalog is empty; scrape the API guide or load a snapshot first",
            ));
        }
        if query.datasets.is_empty() {
            return Err(EntsoeError::precondition("at least one dataset is required"));
        }
        if query.areas.is_empty() {
            return Err(EntsoeError::precondition("at least one area is required"));
        }

        let resolver = self.resolver();
        let mut descriptors: Vec<&DatasetDescriptor> = Vec::with_capacity(query.datasets.len());
        for dataset in &query.datasets {
            let descriptor = self.resolve_dataset(&resolver, dataset)?;
            if !descriptors.iter().any(|d| d.name() == descriptor.name()) {
                descriptors.push(descriptor);
            }
        }
        let intervals = resolve_windows(&query.windows, now)?;

        // --- Areas ---
        progress.phase("Resolving areas");
        let mut failures = Vec::new();
        let mut jobs = Vec::with_capacity(descriptors.len());
        for descriptor in descriptors {
            let pairs = resolve_pairs(&resolver, descriptor, &query.areas, &mut failures);
            jobs.push((descriptor, pairs));
        }

        // --- Requests ---
        let remapper = Remapper::new(resolver);
        let flattener = Flattener::new().with_remapper(&remapper);

        let total: usize = jobs.iter().map(|(_, pairs)| pairs.len()).sum::<usize>() * intervals.len();
        info!(
            datasets = jobs.len(),
            requests = total,
            windows = intervals.len(),
            "starting query"
        );
        progress.phase("Requesting data");

        let mut tables = Vec::new();
        let mut current = 0;
        for (descriptor, pairs) in &jobs {
            let run = Run {
                descriptor,
                api_key,
                flattener: &flattener,
            };
            for pair in pairs {
                for interval in &intervals {
                    current += 1;
                    let label = format!("{} {pair} {interval}", descriptor.name());
                    progress.request_started(&label, current, total);
                    let state = self
                        .drive(&run, pair, interval, &label, &mut tables, &mut failures)
                        .await;
                    progress.request_finished(&label, state);
                }
            }
        }

        // --- Aggregation ---
        progress.phase("Merging results");
        let result = aggregate(tables, failures);
        info!(
            rows = result.table.len(),
            failures = result.failures.len(),
            requests = total,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "query complete"
        );
        progress.done(&result);
        Ok(result)
    }

    fn resolve_dataset<'c>(
        &'c self,
        resolver: &Resolver<'c>,
        query: &str,
    ) -> Result<&'c DatasetDescriptor> {
        match resolver.resolve_dataset(query) {
            FuzzyMatch::Single(name) => self.catalog.dataset(name).ok_or_else(|| {
                EntsoeError::precondition(format!("dataset '{name}' missing from catalog"))
            }),
            FuzzyMatch::Ambiguous(names) => Err(EntsoeError::precondition(format!(
                "dataset '{query}' is ambiguous: {}",
                names.join(", ")
            ))),
            FuzzyMatch::NotFound => Err(EntsoeError::precondition(format!(
                "no dataset matches '{query}'"
            ))),
        }
    }

    /// Drive one logical request to a terminal state.
    async fn drive(
        &self,
        run: &Run<'_, '_>,
        pair: &AreaPair,
        interval: &TimeInterval,
        label: &str,
        tables: &mut Vec<Table>,
        failures: &mut Vec<Failure>,
    ) -> RequestState {
        let mut lifecycle = Lifecycle::new(label);
        lifecycle.advance(RequestState::Requested);

        let (params, outcome) = self.attempt(run, pair, interval).await;
        match outcome {
            Outcome::Success(table) => {
                lifecycle.advance(RequestState::Success);
                tables.push(table);
            }
            Outcome::Oversized { limit, .. } if lifecycle.advance(RequestState::OversizedRetry) => {
                let pieces = split_interval(interval, limit.step());
                info!(
                    request = label,
                    pieces = pieces.len(),
                    step_days = limit.step().num_days(),
                    "range over limit, splitting"
                );
                lifecycle.advance(RequestState::Requested);

                let mut any_success = false;
                for piece in &pieces {
                    let (params, outcome) = self.attempt(run, pair, piece).await;
                    match outcome {
                        Outcome::Success(table) => {
                            any_success = true;
                            tables.push(table);
                        }
                        Outcome::Oversized { reason, .. } | Outcome::Failure(reason) => {
                            failures.push(run.failure(&params, reason));
                        }
                    }
                }
                lifecycle.advance(if any_success {
                    RequestState::Success
                } else {
                    RequestState::Failure
                });
            }
            Outcome::Oversized { reason, .. } | Outcome::Failure(reason) => {
                lifecycle.advance(RequestState::Failure);
                failures.push(run.failure(&params, reason));
            }
        }
        lifecycle.state
    }

    /// Issue one request and classify its response. Transport, parse and
    /// archive errors become failures.
    async fn attempt(
        &self,
        run: &Run<'_, '_>,
        pair: &AreaPair,
        interval: &TimeInterval,
    ) -> (RequestParams, Outcome) {
        let params = fill_parameters(
            run.descriptor,
            &pair.origin,
            pair.destination.as_deref(),
            interval,
        );

        let outcome = match self.request(run, &params).await {
            Ok(Outcome::Success(mut table)) => {
                annotate(&mut table, run.descriptor.name(), &params);
                info!(%params, rows = table.len(), "request succeeded");
                Outcome::Success(table)
            }
            Ok(Outcome::Oversized { limit, reason }) => {
                info!(%params, allowed = limit.amount, unit = ?limit.unit, "request over range limit");
                Outcome::Oversized { limit, reason }
            }
            Ok(Outcome::Failure(reason)) => {
                warn!(%params, %reason, "request rejected");
                Outcome::Failure(reason)
            }
            Err(e) => {
                warn!(%params, error = %e, "request failed");
                Outcome::Failure(e.to_string())
            }
        };
        (params, outcome)
    }

    async fn request(&self, run: &Run<'_, '_>, params: &RequestParams) -> Result<Outcome> {
        let url = params.to_url(&self.config.base_url, run.api_key)?;
        self.limiter.acquire().await;
        let response = self.transport.fetch(url.as_str()).await?;
        classify(&response, run.flattener)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn resolve_windows(windows: &[TimeWindow], now: NaiveDateTime) -> Result<Vec<TimeInterval>> {
    if windows.is_empty() {
        return Ok(vec![TimeWindow::default().resolve(now)?]);
    }
    windows.iter().map(|w| w.resolve(now)).collect()
}

/// Resolve free-text areas to codes and expand them for the dataset.
/// An area that does not resolve becomes a failure and issues no request.
fn resolve_pairs(
    resolver: &Resolver<'_>,
    descriptor: &DatasetDescriptor,
    areas: &[AreaQuery],
    failures: &mut Vec<Failure>,
) -> Vec<AreaPair> {
    let mut unresolved = |text: &str| {
        warn!(area = text, "area not resolved");
        failures.push(Failure {
            dataset: descriptor.name().to_string(),
            parameters: format!("area={text}"),
            reason: format!("no area matches '{text}'"),
        });
    };

    let mut pairs = Vec::with_capacity(areas.len());
    for area in areas {
        let Some(origin) = resolver.resolve_area(&area.origin).code().map(str::to_string) else {
            unresolved(&area.origin);
            continue;
        };
        let destination = match area.destination.as_deref() {
            Some(text) => match resolver.resolve_area(text).code() {
                Some(code) => Some(code.to_string()),
                None => {
                    unresolved(text);
                    continue;
                }
            },
            None => None,
        };
        pairs.push(AreaPair::new(origin, destination));
    }

    let known: Vec<&str> = resolver
        .area_table()
        .map(|table| table.codes().collect())
        .unwrap_or_default();
    expand_pairs(&pairs, descriptor.requires_destination(), &known)
}

fn classify(response: &FetchResponse, flattener: &Flattener<'_>) -> Result<Outcome> {
    if archive::is_archive(response.content_type.as_deref(), &response.body) {
        let mut table = Table::new();
        for (name, bytes) in archive::unpack(&response.body)? {
            let doc = Document::parse_bytes(&bytes)?;
            if let Some(reason) = extract_reason(&doc) {
                return Ok(rejection(reason));
            }
            debug!(entry = %name, "flattening archive entry");
            table.extend(flattener.flatten(&doc));
        }
        return Ok(Outcome::Success(table));
    }

    if response.body.iter().all(u8::is_ascii_whitespace) {
        return Ok(if response.is_success() {
            Outcome::Success(Table::new())
        } else {
            Outcome::Failure(format!("HTTP {} with empty body", response.status))
        });
    }

    let doc = match Document::parse_bytes(&response.body) {
        Ok(doc) => doc,
        Err(_) if !response.is_success() => {
            return Ok(Outcome::Failure(format!("HTTP {}", response.status)));
        }
        Err(e) => return Err(e),
    };
    if let Some(reason) = extract_reason(&doc) {
        return Ok(rejection(reason));
    }
    if !response.is_success() {
        return Ok(Outcome::Failure(format!("HTTP {}", response.status)));
    }
    Ok(Outcome::Success(flattener.flatten(&doc)))
}

fn rejection(reason: String) -> Outcome {
    match RangeLimit::from_reason(&reason) {
        Some(limit) => Outcome::Oversized { limit, reason },
        None => Outcome::Failure(reason),
    }
}

/// Prefix a success table with the dataset, success flag, parameters and an
/// empty reason.
fn annotate(table: &mut Table, dataset: &str, params: &RequestParams) {
    table.insert_column(0, DATASET_COLUMN, Cell::text(dataset));
    table.insert_column(1, SUCCESS_COLUMN, Cell::from(true));
    table.insert_column(2, PARAMETERS_COLUMN, Cell::text(params.to_string()));
    table.insert_column(3, REASON_COLUMN, Cell::Empty);
}

fn aggregate(tables: Vec<Table>, failures: Vec<Failure>) -> QueryResult {
    let mut successes = Table::new();
    for table in tables {
        successes.extend(table);
    }
    let mut table = merge_rows(&successes, DEFAULT_EXTENDS);
    add_sample_timestamps(&mut table);
    table.map_cells(Cell::unwrap_singleton);
    QueryResult { failures, table }
}

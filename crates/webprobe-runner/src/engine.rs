//! Run orchestration: task planning, independent and dynamic modes, progress,
//! cancellation.
//!
//! Every engine owns a rayon pool sized by `Config.workers`. A run's
//! coordinator is spawned onto that pool; independent runs fan out with an
//! indexed parallel iterator, so results come back in submission order,
//! while dynamic runs step through the plan in order, threading cookie state
//! from one probe into the next. Only the coordinator publishes results.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::{Condvar, Mutex, MutexGuard};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use rayon::prelude::*;

use webprobe_core::{
    Config, DynamicOptions, Endpoint, ErrorMatcher, MatcherError, PartialDictionary, ProbeKind,
    Severity, TestResult, TestResultFilter, Workspace,
};

use crate::client::{HttpClient, ReqwestClient};
use crate::probe::Prober;
use crate::wordlist::{WordlistCache, WordlistError};

/// Engine errors
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("A test run is already in progress")]
    AlreadyRunning,
    #[error(transparent)]
    Wordlist(#[from] WordlistError),
    #[error(transparent)]
    Matcher(#[from] MatcherError),
    #[error("HTTP client error: {0}")]
    Http(String),
    #[error("Cannot build worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Running,
}

/// How the last run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    Cancelled,
}

/// What a single task sends
#[derive(Debug, Clone)]
pub enum TaskKind {
    Match,
    Fuzz,
    /// Payloads resolved from the endpoint's wordlist
    SqlInjection(Arc<[String]>),
}

/// One unit of work: a probe against an endpoint.
#[derive(Debug, Clone)]
pub struct ProbeTask {
    pub endpoint: Arc<Endpoint>,
    pub kind: TaskKind,
}

impl ProbeTask {
    #[must_use]
    pub fn probe(&self) -> ProbeKind {
        match self.kind {
            TaskKind::Match => ProbeKind::Match,
            TaskKind::Fuzz => ProbeKind::Fuzz,
            TaskKind::SqlInjection(_) => ProbeKind::SqlInjection,
        }
    }

    fn execute(
        &self,
        prober: Prober<'_>,
        cookies: Option<&PartialDictionary>,
        rng: &mut SmallRng,
    ) -> TestResult {
        match &self.kind {
            TaskKind::Match => prober.match_probe(&self.endpoint, cookies),
            TaskKind::Fuzz => prober.fuzz_probe(&self.endpoint, cookies, rng),
            TaskKind::SqlInjection(payloads) => {
                prober.sql_injection_probe(&self.endpoint, payloads, cookies, rng)
            }
        }
    }
}

/// Expand endpoints into tasks: per endpoint, match, then fuzz × count,
/// then SQL injection × count.
///
/// # Errors
///
/// Returns error if a SQL-injection wordlist cannot be loaded.
pub fn plan_tasks(
    endpoints: &[Arc<Endpoint>],
    wordlists: &WordlistCache,
) -> Result<Vec<ProbeTask>, WordlistError> {
    let mut tasks = Vec::new();
    for endpoint in endpoints {
        let task = |kind: TaskKind| ProbeTask {
            endpoint: Arc::clone(endpoint),
            kind,
        };
        if endpoint.match_test {
            tasks.push(task(TaskKind::Match));
        }
        if let Some(fuzz) = &endpoint.fuzz_test {
            tasks.extend((0..fuzz.count).map(|_| task(TaskKind::Fuzz)));
        }
        if let Some(sqli) = &endpoint.sql_injection_test {
            let payloads = wordlists.load(&sqli.wordlist)?;
            tasks.extend((0..sqli.count).map(|_| task(TaskKind::SqlInjection(Arc::clone(&payloads)))));
        }
    }
    Ok(tasks)
}

/// Cookie state after `result`: an Ok response's cookies are merged in,
/// anything else leaves the state untouched.
#[must_use]
pub fn next_cookie_state(state: PartialDictionary, result: &TestResult) -> PartialDictionary {
    match &result.response {
        Some(response) if result.severity == Severity::Ok => {
            PartialDictionary::merge(&state, &response.cookies)
        }
        _ => state,
    }
}

/// Per-run flags shared between the engine and the run's workers.
#[derive(Debug, Default)]
struct RunSignals {
    cancel: AtomicBool,
    /// Tasks finished so far
    done: AtomicUsize,
}

#[derive(Default)]
struct RunStore {
    /// Id of the newest run
    generation: u64,
    running: bool,
    signals: Arc<RunSignals>,
    /// Progress frozen when the run stopped
    collected: usize,
    total: usize,
    outcome: Option<RunOutcome>,
    /// Newest run whose coordinator has returned
    exited_run: u64,
    results: Vec<TestResult>,
    filter: Option<TestResultFilter>,
    filtered: Vec<TestResult>,
}

impl RunStore {
    fn refilter(&mut self) {
        self.filtered = match &self.filter {
            Some(f) => f.apply(&self.results),
            None => self.results.clone(),
        };
    }

    /// Tasks counted towards progress. Stays below `total` until published.
    fn progress_count(&self) -> usize {
        if self.running {
            self.signals
                .done
                .load(Ordering::SeqCst)
                .min(self.total.saturating_sub(1))
        } else {
            self.collected
        }
    }
}

#[derive(Default)]
struct Shared {
    store: Mutex<RunStore>,
    changed: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, RunStore> {
        self.store.lock()
    }
}

/// Everything a coordinator needs, detached from the engine.
struct Run {
    id: u64,
    signals: Arc<RunSignals>,
    shared: Arc<Shared>,
    client: Arc<dyn HttpClient>,
    matcher: Arc<ErrorMatcher>,
}

impl Run {
    fn cancelled(&self) -> bool {
        self.signals.cancel.load(Ordering::SeqCst)
    }

    fn task_done(&self) {
        self.signals.done.fetch_add(1, Ordering::SeqCst);
    }

    fn prober(&self) -> Prober<'_> {
        Prober::new(self.client.as_ref(), &self.matcher)
    }

    fn execute(self, tasks: &[ProbeTask], dynamic: Option<&DynamicOptions>) {
        let results = match dynamic {
            Some(options) => self.run_dynamic(tasks, options),
            None => self.run_independent(tasks),
        };
        self.finish(results);
    }

    /// Runs on the pool that spawned the coordinator. Tasks not yet started
    /// when the cancel flag is raised are skipped.
    fn run_independent(&self, tasks: &[ProbeTask]) -> Vec<TestResult> {
        let prober = self.prober();
        let results: Vec<Option<TestResult>> = tasks
            .par_iter()
            .with_max_len(1)
            .map_init(SmallRng::from_entropy, |rng, task| {
                if self.cancelled() {
                    return None;
                }
                let result = task.execute(prober, None, rng);
                self.task_done();
                Some(result)
            })
            .collect();
        results.into_iter().flatten().collect()
    }

    fn run_dynamic(&self, tasks: &[ProbeTask], options: &DynamicOptions) -> Vec<TestResult> {
        let mut rng = SmallRng::from_entropy();
        let prober = self.prober();
        let mut cookies = options.starting_cookies();
        let mut results = Vec::with_capacity(tasks.len());

        for task in tasks {
            if self.cancelled() {
                break;
            }
            let result = task.execute(prober, Some(&cookies), &mut rng);
            cookies = next_cookie_state(cookies, &result);
            tracing::debug!("cookie state now {:?}", cookies.get());
            results.push(result);
            self.task_done();
        }
        results
    }

    fn finish(self, results: Vec<TestResult>) {
        let mut store = self.shared.lock();
        if store.generation == self.id && store.running {
            tracing::info!("Run {} completed with {} results", self.id, results.len());
            store.results = results;
            store.refilter();
            store.collected = store.total;
            store.running = false;
            store.outcome = Some(RunOutcome::Completed);
        } else {
            tracing::debug!("Run {} exited after cancellation, dropping results", self.id);
        }
        store.exited_run = store.exited_run.max(self.id);
        self.shared.changed.notify_all();
    }
}

/// Drives probe runs against a workspace's endpoints.
pub struct Engine {
    client: Arc<dyn HttpClient>,
    matcher: Arc<ErrorMatcher>,
    wordlists: WordlistCache,
    pool: rayon::ThreadPool,
    cancel_grace: Duration,
    shared: Arc<Shared>,
}

impl Engine {
    /// # Errors
    ///
    /// Returns error if the worker pool cannot be built.
    pub fn new(
        client: Arc<dyn HttpClient>,
        matcher: Arc<ErrorMatcher>,
        config: &Config,
    ) -> Result<Self, EngineError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.workers.max(1))
            .thread_name(|i| format!("webprobe-worker-{i}"))
            .build()?;
        Ok(Self {
            client,
            matcher,
            wordlists: WordlistCache::new(),
            pool,
            cancel_grace: config.cancel_grace(),
            shared: Arc::new(Shared::default()),
        })
    }

    /// Engine with the reqwest client and the config's error phrases.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client, the phrase matcher or the worker
    /// pool cannot be built.
    pub fn from_config(config: &Config) -> Result<Self, EngineError> {
        let client =
            ReqwestClient::new(&config.user_agent).map_err(|e| EngineError::Http(e.to_string()))?;
        let matcher = config.error_matcher()?;
        tracing::debug!("loaded {} error phrases", matcher.phrase_count());
        Self::new(Arc::new(client), Arc::new(matcher), config)
    }

    /// Start a run over the workspace's enabled endpoints and return at once.
    /// Dynamic mode when the workspace carries dynamic options.
    ///
    /// # Errors
    ///
    /// Returns error if a run is active or a wordlist cannot be loaded.
    pub fn start_testing(&self, workspace: &Workspace) -> Result<(), EngineError> {
        let mut store = self.shared.lock();
        if store.running {
            return Err(EngineError::AlreadyRunning);
        }

        let endpoints: Vec<Arc<Endpoint>> =
            workspace.enabled_endpoints().cloned().map(Arc::new).collect();
        let tasks = plan_tasks(&endpoints, &self.wordlists)?;
        let dynamic = workspace.dynamic_options.clone();
        let total = tasks.len();

        let id = store.generation + 1;
        let signals = Arc::new(RunSignals::default());
        let run = Run {
            id,
            signals: Arc::clone(&signals),
            shared: Arc::clone(&self.shared),
            client: Arc::clone(&self.client),
            matcher: Arc::clone(&self.matcher),
        };

        tracing::info!(
            "Starting run {id}: {} endpoints, {} tasks, {} mode",
            endpoints.len(),
            total,
            if dynamic.is_some() { "dynamic" } else { "independent" }
        );

        // The coordinator blocks on the store lock until the fields below are set.
        self.pool.spawn(move || run.execute(&tasks, dynamic.as_ref()));

        store.generation = id;
        store.running = true;
        store.signals = signals;
        store.collected = 0;
        store.total = total;
        store.outcome = None;
        Ok(())
    }

    /// Stop the active run. Returns to Idle at once, then gives in-flight
    /// probes up to the cancel grace period to wind down. No-op while Idle.
    pub fn cancel_testing(&self) {
        let mut store = self.shared.lock();
        if !store.running {
            return;
        }
        let id = store.generation;
        store.signals.cancel.store(true, Ordering::SeqCst);
        store.collected = store.progress_count();
        store.running = false;
        store.outcome = Some(RunOutcome::Cancelled);
        self.shared.changed.notify_all();
        tracing::warn!("Cancelling run {id}");

        let wait = self
            .shared
            .changed
            .wait_while_for(&mut store, |s| s.exited_run < id, self.cancel_grace);
        if wait.timed_out() {
            tracing::warn!(
                "Run {id} still has requests in flight after {:?}",
                self.cancel_grace
            );
        }
    }

    /// Block until the active run ends. Returns at once while Idle.
    pub fn wait(&self) {
        let mut store = self.shared.lock();
        self.shared.changed.wait_while(&mut store, |s| s.running);
    }

    /// Start a run and block until it ends.
    ///
    /// # Errors
    ///
    /// Same as [`Engine::start_testing`].
    pub fn run(&self, workspace: &Workspace) -> Result<Vec<TestResult>, EngineError> {
        self.start_testing(workspace)?;
        self.wait();
        Ok(self.results())
    }

    #[must_use]
    pub fn state(&self) -> EngineState {
        if self.shared.lock().running {
            EngineState::Running
        } else {
            EngineState::Idle
        }
    }

    #[must_use]
    pub fn in_progress(&self) -> bool {
        self.state() == EngineState::Running
    }

    /// Fraction of the active (or last) run's tasks collected, in `[0, 1]`.
    #[must_use]
    pub fn progress(&self) -> f64 {
        let store = self.shared.lock();
        if store.total == 0 {
            return if store.outcome == Some(RunOutcome::Completed) {
                1.0
            } else {
                0.0
            };
        }
        store.progress_count() as f64 / store.total as f64
    }

    #[must_use]
    pub fn last_outcome(&self) -> Option<RunOutcome> {
        self.shared.lock().outcome
    }

    /// Results of the last completed run, unfiltered.
    #[must_use]
    pub fn results(&self) -> Vec<TestResult> {
        self.shared.lock().results.clone()
    }

    /// Results of the last completed run under the current filter.
    #[must_use]
    pub fn test_results(&self) -> Vec<TestResult> {
        self.shared.lock().filtered.clone()
    }

    pub fn set_result_filter(&self, filter: Option<TestResultFilter>) {
        let mut store = self.shared.lock();
        store.filter = filter;
        store.refilter();
    }

    #[must_use]
    pub const fn wordlists(&self) -> &WordlistCache {
        &self.wordlists
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.cancel_testing();
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::thread;
    use std::time::Instant;

    use super::*;
    use crate::client::{LiveResponse, OutgoingRequest};
    use webprobe_core::{
        DispatchError, FuzzTest, HttpMethod, HttpRequest, HttpResponse, Interaction,
        SqlInjectionTest,
    };

    type Responder = dyn Fn(&OutgoingRequest<'_>) -> Result<LiveResponse, DispatchError> + Send + Sync;

    /// Answers through a closure, recording `(url, cookie header)` per call.
    struct ScriptedClient {
        respond: Box<Responder>,
        delay: Duration,
        calls: Mutex<Vec<(String, Option<String>)>>,
    }

    impl ScriptedClient {
        fn new(
            respond: impl Fn(&OutgoingRequest<'_>) -> Result<LiveResponse, DispatchError>
            + Send
            + Sync
            + 'static,
        ) -> Arc<Self> {
            Arc::new(Self {
                respond: Box::new(respond),
                delay: Duration::ZERO,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn ok() -> Arc<Self> {
            Self::new(|_| Ok(LiveResponse::new(200, "{}")))
        }

        fn slow(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                respond: Box::new(|_| Ok(LiveResponse::new(200, "{}"))),
                delay,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<(String, Option<String>)> {
            self.calls.lock().clone()
        }
    }

    impl HttpClient for ScriptedClient {
        fn send(&self, request: &OutgoingRequest<'_>) -> Result<LiveResponse, DispatchError> {
            self.calls
                .lock()
                .push((request.url.to_string(), request.cookie_header()));
            if !self.delay.is_zero() {
                thread::sleep(self.delay);
            }
            (self.respond)(request)
        }
    }

    fn config() -> Config {
        Config {
            workers: 2,
            cancel_grace_ms: 2000,
            ..Config::default()
        }
    }

    fn engine(client: Arc<ScriptedClient>) -> Engine {
        let matcher = ErrorMatcher::from_phrases(["Fatal error"]).unwrap();
        Engine::new(client, Arc::new(matcher), &config()).unwrap()
    }

    fn get(url: &str) -> Endpoint {
        let mut ep = Endpoint::new(
            url,
            Interaction::new(HttpRequest::new(HttpMethod::Get), HttpResponse::expect(200)),
        );
        ep.fuzz_test = None;
        ep
    }

    fn wait_until(what: impl Fn() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !what() {
            assert!(Instant::now() < deadline, "condition not reached in time");
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn plan_orders_match_fuzz_sqli() {
        let dir = tempfile::tempdir().unwrap();
        let wordlist = dir.path().join("sqli.txt");
        std::fs::write(&wordlist, "' OR 1=1--\n").unwrap();

        let mut ep = get("http://localhost/a");
        ep.fuzz_test = Some(FuzzTest { count: 2 });
        ep.sql_injection_test = Some(SqlInjectionTest {
            count: 1,
            wordlist: wordlist.clone(),
        });
        let tasks = plan_tasks(&[Arc::new(ep)], &WordlistCache::new()).unwrap();
        let kinds: Vec<ProbeKind> = tasks.iter().map(ProbeTask::probe).collect();
        assert_eq!(
            kinds,
            vec![
                ProbeKind::Match,
                ProbeKind::Fuzz,
                ProbeKind::Fuzz,
                ProbeKind::SqlInjection
            ]
        );
    }

    #[test]
    fn fuzz_count_yields_that_many_results() {
        let client = ScriptedClient::ok();
        let engine = engine(Arc::clone(&client));
        let mut ep = get("http://localhost/items");
        ep.interaction.request.method = HttpMethod::Post;
        ep.fuzz_test = Some(FuzzTest { count: 5 });

        let results = engine.run(&Workspace::new(vec![ep])).unwrap();

        assert_eq!(results.len(), 6);
        assert_eq!(results[0].probe, ProbeKind::Match);
        assert_eq!(
            results.iter().filter(|r| r.probe == ProbeKind::Fuzz).count(),
            5
        );
        assert_eq!(client.calls().len(), 6);
        assert_eq!(engine.last_outcome(), Some(RunOutcome::Completed));
        assert!((engine.progress() - 1.0).abs() < f64::EPSILON);
        assert_eq!(engine.state(), EngineState::Idle);
    }

    #[test]
    fn independent_results_keep_submission_order() {
        let client = ScriptedClient::ok();
        let engine = engine(client);
        let endpoints: Vec<Endpoint> = (0..8)
            .map(|i| get(&format!("http://localhost/e{i}")))
            .collect();

        let results = engine.run(&Workspace::new(endpoints)).unwrap();
        let urls: Vec<&str> = results.iter().map(|r| r.endpoint.url.as_str()).collect();
        let expected: Vec<String> = (0..8).map(|i| format!("http://localhost/e{i}")).collect();
        assert_eq!(urls, expected);
    }

    #[test]
    fn disabled_endpoints_are_skipped() {
        let client = ScriptedClient::ok();
        let engine = engine(Arc::clone(&client));
        let mut off = get("http://localhost/off");
        off.enabled = false;

        let results = engine
            .run(&Workspace::new(vec![off, get("http://localhost/on")]))
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(client.calls()[0].0, "http://localhost/on");
    }

    #[test]
    fn dynamic_mode_chains_cookies() {
        let client = ScriptedClient::new(|req| {
            let resp = LiveResponse::new(200, "{}");
            Ok(if req.url.ends_with("/login") {
                resp.with_cookie("session", "abc")
            } else {
                resp
            })
        });
        let engine = engine(Arc::clone(&client));

        let mut own = get("http://localhost/own");
        own.interaction.request.cookies = PartialDictionary::from_mapping([("session", "mine")]);
        let mut workspace = Workspace::new(vec![
            get("http://localhost/login"),
            get("http://localhost/profile"),
            own,
        ]);
        workspace.dynamic_options = Some(DynamicOptions::default());

        let results = engine.run(&workspace).unwrap();
        assert_eq!(results.len(), 3);

        let calls = client.calls();
        assert_eq!(calls[0], ("http://localhost/login".into(), None));
        assert_eq!(
            calls[1],
            ("http://localhost/profile".into(), Some("session=abc".into()))
        );
        assert_eq!(
            calls[2],
            ("http://localhost/own".into(), Some("session=mine".into()))
        );
    }

    #[test]
    fn dynamic_mode_starts_from_initial_cookies() {
        let client = ScriptedClient::ok();
        let engine = engine(Arc::clone(&client));
        let mut workspace = Workspace::new(vec![get("http://localhost/a")]);
        workspace.dynamic_options = Some(DynamicOptions {
            use_initial_values: true,
            initial_cookies: PartialDictionary::from_mapping([("token", "t0")]),
        });

        engine.run(&workspace).unwrap();
        assert_eq!(client.calls()[0].1.as_deref(), Some("token=t0"));
    }

    #[test]
    fn failed_results_do_not_update_cookie_state() {
        let state = PartialDictionary::from_mapping([("session", "abc")]);
        let ep = Arc::new(get("http://localhost/a"));
        let mut result = TestResult::classified(
            Arc::clone(&ep),
            ProbeKind::Match,
            (Severity::Danger, "Unmatched return status"),
            Duration::ZERO,
            ep.interaction.request.clone(),
            LiveResponse::new(404, "{}")
                .with_cookie("session", "evil")
                .into_response(),
        );
        assert_eq!(next_cookie_state(state.clone(), &result).get()["session"], "abc");

        result.severity = Severity::Ok;
        assert_eq!(next_cookie_state(state, &result).get()["session"], "evil");
    }

    #[test]
    fn cancel_while_idle_is_noop() {
        let engine = engine(ScriptedClient::ok());
        engine.cancel_testing();
        assert_eq!(engine.state(), EngineState::Idle);
        assert_eq!(engine.last_outcome(), None);
    }

    #[test]
    fn cancel_stops_submitting() {
        let client = ScriptedClient::slow(Duration::from_millis(20));
        let engine = engine(Arc::clone(&client));
        let mut ep = get("http://localhost/slow");
        ep.fuzz_test = Some(FuzzTest { count: 200 });

        engine.start_testing(&Workspace::new(vec![ep])).unwrap();
        assert!(engine.in_progress());
        wait_until(|| client.calls().len() >= 2);

        engine.cancel_testing();
        assert_eq!(engine.state(), EngineState::Idle);
        assert_eq!(engine.last_outcome(), Some(RunOutcome::Cancelled));

        let sent = client.calls().len();
        thread::sleep(Duration::from_millis(100));
        assert_eq!(client.calls().len(), sent);
        assert!(sent < 201);
        assert!(engine.results().is_empty());
    }

    #[test]
    fn dynamic_cancel_halts_before_next_step() {
        let client = ScriptedClient::slow(Duration::from_millis(20));
        let engine = engine(Arc::clone(&client));
        let endpoints: Vec<Endpoint> = (0..100)
            .map(|i| get(&format!("http://localhost/step{i}")))
            .collect();
        let mut workspace = Workspace::new(endpoints);
        workspace.dynamic_options = Some(DynamicOptions::default());

        engine.start_testing(&workspace).unwrap();
        wait_until(|| !client.calls().is_empty());

        engine.cancel_testing();
        assert_eq!(engine.state(), EngineState::Idle);
        assert_eq!(engine.last_outcome(), Some(RunOutcome::Cancelled));

        let sent = client.calls();
        thread::sleep(Duration::from_millis(100));
        assert_eq!(client.calls(), sent);
        assert!(sent.len() < 100);
        // Sequential: whatever was sent is a prefix of the plan
        for (i, (url, _)) in sent.iter().enumerate() {
            assert_eq!(url, &format!("http://localhost/step{i}"));
        }
        assert!(engine.results().is_empty());
        assert!(engine.test_results().is_empty());
    }

    #[test]
    fn progress_is_monotonic_until_publish() {
        const TOTAL: usize = 8;
        let client = ScriptedClient::slow(Duration::from_millis(15));
        let engine = engine(client);
        let endpoints: Vec<Endpoint> = (0..TOTAL)
            .map(|i| get(&format!("http://localhost/p{i}")))
            .collect();
        let mut workspace = Workspace::new(endpoints);
        workspace.dynamic_options = Some(DynamicOptions::default());

        engine.start_testing(&workspace).unwrap();
        let mut samples = Vec::new();
        loop {
            let progress = engine.progress();
            let state = engine.state();
            if progress >= 1.0 {
                // 1.0 only once results are published
                assert_eq!(state, EngineState::Idle);
            }
            samples.push(progress);
            if state == EngineState::Idle {
                break;
            }
            thread::sleep(Duration::from_millis(2));
        }
        engine.wait();

        for pair in samples.windows(2) {
            assert!(pair[0] <= pair[1], "progress went backwards: {samples:?}");
        }
        for p in &samples {
            let steps = p * TOTAL as f64;
            assert!((steps - steps.round()).abs() < 1e-9, "not a whole step: {p}");
        }
        assert!(samples.iter().any(|p| *p > 0.0 && *p < 1.0));
        assert!((engine.progress() - 1.0).abs() < f64::EPSILON);
        assert_eq!(engine.results().len(), TOTAL);
    }

    #[test]
    fn second_start_while_running_is_rejected() {
        let client = ScriptedClient::slow(Duration::from_millis(20));
        let engine = engine(client);
        let mut ep = get("http://localhost/slow");
        ep.fuzz_test = Some(FuzzTest { count: 50 });
        let workspace = Workspace::new(vec![ep]);

        engine.start_testing(&workspace).unwrap();
        assert!(matches!(
            engine.start_testing(&workspace),
            Err(EngineError::AlreadyRunning)
        ));
        engine.cancel_testing();

        // A fresh run may start once cancelled
        let quick = Workspace::new(vec![get("http://localhost/quick")]);
        engine.start_testing(&quick).unwrap();
        engine.wait();
        assert_eq!(engine.results().len(), 1);
    }

    #[test]
    fn missing_wordlist_fails_start() {
        let engine = engine(ScriptedClient::ok());
        let mut ep = get("http://localhost/login");
        ep.sql_injection_test = Some(SqlInjectionTest {
            count: 1,
            wordlist: PathBuf::from("/nonexistent/sqli.txt"),
        });

        let err = engine.start_testing(&Workspace::new(vec![ep])).unwrap_err();
        assert!(matches!(err, EngineError::Wordlist(WordlistError::Io(..))));
        assert_eq!(engine.state(), EngineState::Idle);
    }

    #[test]
    fn result_filter_applies_to_completed_run() {
        let client = ScriptedClient::new(|req| {
            Ok(if req.url.ends_with("/missing") {
                LiveResponse::new(404, "{}")
            } else {
                LiveResponse::new(200, "{}")
            })
        });
        let engine = engine(client);
        engine.set_result_filter(Some(TestResultFilter {
            min_severity: Some(Severity::Danger),
            ..TestResultFilter::default()
        }));

        engine
            .run(&Workspace::new(vec![
                get("http://localhost/fine"),
                get("http://localhost/missing"),
            ]))
            .unwrap();

        let shown = engine.test_results();
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].verdict, "Unmatched return status");
        assert_eq!(engine.results().len(), 2);

        engine.set_result_filter(None);
        assert_eq!(engine.test_results().len(), 2);
    }

    #[test]
    fn dispatch_failures_become_results() {
        let client = ScriptedClient::new(|_| Err(DispatchError::ConnectTimeout("10s".into())));
        let engine = engine(client);
        let results = engine
            .run(&Workspace::new(vec![get("http://localhost/down")]))
            .unwrap();
        assert_eq!(results[0].severity, Severity::Critical);
        assert_eq!(results[0].verdict, "Connection timeout (exceeded max wait)");
    }

    #[test]
    fn empty_workspace_completes() {
        let engine = engine(ScriptedClient::ok());
        let results = engine.run(&Workspace::default()).unwrap();
        assert!(results.is_empty());
        assert_eq!(engine.last_outcome(), Some(RunOutcome::Completed));
        assert!((engine.progress() - 1.0).abs() < f64::EPSILON);
    }
}

//! The discovery core and its background poll loop.
//!
//! One tokio task sleeps for the poll interval, checks for shutdown, then
//! runs a single synchronous tick. Shutdown is only observed between ticks.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::DiscoveryError;
use crate::host::Host;
use crate::settings::{MAX_POLL_INTERVAL_MS, Settings};
use crate::store::{EndpointStore, StoreView};
use crate::strategy::{Strategy, TickContext};
use crate::types::{EndpointLabel, MatchEvent};

/// Callback invoked with each newly inserted label.
pub type OnDiscoveredFn = Arc<dyn Fn(&EndpointLabel) + Send + Sync + 'static>;

/// Owns the endpoint store, settings and poll loop for one strategy.
pub struct DiscoveryCore {
    shared: Arc<Shared>,
    worker: tokio::sync::Mutex<Option<Worker>>,
}

struct Shared {
    store: EndpointStore,
    settings: Settings,
    strategy: Box<dyn Strategy>,
    host: Arc<dyn Host>,
    on_discovered: Mutex<Option<OnDiscoveredFn>>,
}

struct Worker {
    cancel: CancellationToken,
    rescan: Arc<Notify>,
    handle: JoinHandle<()>,
}

impl Shared {
    /// Clamps a requested interval to `[floor, MAX_POLL_INTERVAL_MS]`.
    fn clamp_interval(&self, ms: u64) -> u64 {
        ms.min(MAX_POLL_INTERVAL_MS).max(self.strategy.poll_floor_ms())
    }

    fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.clamp_interval(self.settings.poll_interval_ms()))
    }

    fn tick(&self) -> Vec<EndpointLabel> {
        let keep_duplicates = self.settings.keep_duplicates();
        let ctx = TickContext {
            host: self.host.as_ref(),
            store: &self.store,
            keep_duplicates,
            generation: self.strategy.match_generation(),
        };

        let candidates = self.strategy.on_tick(&ctx);
        if candidates.is_empty() {
            return Vec::new();
        }

        // A match restart during the tick invalidates its candidates.
        let inserted = self.store.insert_all_if(candidates, keep_duplicates, || {
            self.strategy.match_generation() == ctx.generation
        });
        if inserted.is_empty() {
            if self.strategy.match_generation() != ctx.generation {
                tracing::debug!(strategy = self.strategy.name(), "match restarted mid-tick, candidates dropped");
            }
            return Vec::new();
        }
        self.strategy.on_inserted(&ctx, &inserted);

        for label in &inserted {
            tracing::info!(strategy = self.strategy.name(), label = %label, "endpoint discovered");
        }

        let callback = self
            .on_discovered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(callback) = callback {
            for label in &inserted {
                callback(label);
            }
        }

        inserted
    }
}

impl DiscoveryCore {
    /// Creates a stopped core with an empty store.
    pub fn new(strategy: impl Strategy, host: Arc<dyn Host>, settings: Settings) -> Self {
        Self {
            shared: Arc::new(Shared {
                store: EndpointStore::new(),
                settings,
                strategy: Box::new(strategy),
                host,
                on_discovered: Mutex::new(None),
            }),
            worker: tokio::sync::Mutex::new(None),
        }
    }

    /// Sets the callback for newly discovered endpoints.
    pub fn set_on_discovered(&self, f: OnDiscoveredFn) {
        *self
            .shared
            .on_discovered
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(f);
    }

    /// Starts the poll loop on the current tokio runtime.
    pub async fn start(&self) -> Result<(), DiscoveryError> {
        let mut worker = self.worker.lock().await;
        if worker.is_some() {
            return Err(DiscoveryError::AlreadyRunning);
        }

        let cancel = CancellationToken::new();
        let rescan = Arc::new(Notify::new());
        let handle = tokio::spawn(poll_loop(
            Arc::clone(&self.shared),
            cancel.clone(),
            Arc::clone(&rescan),
        ));

        *worker = Some(Worker {
            cancel,
            rescan,
            handle,
        });

        tracing::info!(
            strategy = self.shared.strategy.name(),
            interval_ms = self.shared.poll_interval().as_millis() as u64,
            "discovery started"
        );
        Ok(())
    }

    /// Stops the poll loop and waits for it to exit. A tick in progress
    /// finishes first. Stopping a stopped core does nothing.
    pub async fn stop(&self) -> Result<(), DiscoveryError> {
        let Some(worker) = self.worker.lock().await.take() else {
            return Ok(());
        };

        worker.cancel.cancel();
        worker
            .handle
            .await
            .map_err(|e| DiscoveryError::Join(e.to_string()))?;

        tracing::info!(strategy = self.shared.strategy.name(), "discovery stopped");
        Ok(())
    }

    /// Returns `true` if the poll loop is running.
    pub async fn is_running(&self) -> bool {
        self.worker.lock().await.is_some()
    }

    /// Wakes the poll loop for an immediate tick.
    pub async fn request_rescan(&self) -> Result<(), DiscoveryError> {
        if !self.shared.strategy.supports_rescan() {
            return Err(DiscoveryError::RescanUnsupported(self.shared.strategy.name()));
        }
        let worker = self.worker.lock().await;
        let worker = worker.as_ref().ok_or(DiscoveryError::NotRunning)?;
        worker.rescan.notify_one();
        tracing::debug!("rescan requested");
        Ok(())
    }

    /// Runs one tick on the calling thread and returns the inserted labels.
    pub fn tick(&self) -> Vec<EndpointLabel> {
        self.shared.tick()
    }

    /// Forwards a match lifecycle event to the strategy.
    pub fn on_match_event(&self, event: MatchEvent) {
        tracing::info!(strategy = self.shared.strategy.name(), %event, "match event");
        match event {
            MatchEvent::Started => self.shared.strategy.on_match_start(&self.shared.store),
            MatchEvent::Ended => self.shared.strategy.on_match_end(),
        }
    }

    /// Clears the endpoint list and selection.
    pub fn reset(&self) {
        self.shared.store.clear();
        self.shared.strategy.on_reset();
        tracing::info!("endpoint list reset");
    }

    /// The endpoint store, for UI reads.
    pub fn store(&self) -> &EndpointStore {
        &self.shared.store
    }

    /// Labels plus selection, resolving an unset selection to the first entry.
    pub fn view(&self) -> StoreView {
        self.shared.store.view()
    }

    pub fn settings(&self) -> &Settings {
        &self.shared.settings
    }

    /// Sets the poll interval, clamped between the strategy floor and
    /// [`MAX_POLL_INTERVAL_MS`]. Returns the value stored. Takes effect after
    /// the current sleep.
    pub fn set_poll_interval_ms(&self, ms: u64) -> u64 {
        let ms = self.shared.clamp_interval(ms);
        self.shared.settings.set_poll_interval_ms(ms);
        ms
    }

    pub fn set_keep_duplicates(&self, keep: bool) {
        self.shared.settings.set_keep_duplicates(keep);
    }

    /// Effective interval between ticks.
    pub fn poll_interval(&self) -> Duration {
        self.shared.poll_interval()
    }

    pub fn strategy_name(&self) -> &'static str {
        self.shared.strategy.name()
    }

    pub fn supports_rescan(&self) -> bool {
        self.shared.strategy.supports_rescan()
    }
}

impl Drop for DiscoveryCore {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.get_mut().take() {
            worker.cancel.cancel();
        }
    }
}

/// Main poll loop.
async fn poll_loop(shared: Arc<Shared>, cancel: CancellationToken, rescan: Arc<Notify>) {
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = rescan.notified() => {}
            _ = tokio::time::sleep(shared.poll_interval()) => {}
        }
        if cancel.is_cancelled() {
            break;
        }
        shared.tick();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::{ActiveScan, Candidate, LogTail, ScanPhase};
    use crate::test_support::{FakeHost, conn};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    fn texts(core: &DiscoveryCore) -> Vec<String> {
        core.store().snapshot().into_iter().map(String::from).collect()
    }

    fn active_core(host: &Arc<FakeHost>, poll_ms: u64) -> DiscoveryCore {
        DiscoveryCore::new(
            ActiveScan::new("RocketLeague.exe"),
            Arc::clone(host) as Arc<dyn Host>,
            Settings::new(poll_ms, false),
        )
    }

    #[test]
    fn poll_interval_respects_floor() {
        let host = Arc::new(FakeHost::new());
        let core = active_core(&host, 10);
        assert_eq!(core.poll_interval(), Duration::from_millis(250));

        assert_eq!(core.set_poll_interval_ms(100), 250);
        assert_eq!(core.set_poll_interval_ms(800), 800);
        assert_eq!(core.poll_interval(), Duration::from_millis(800));

        let log = DiscoveryCore::new(LogTail::new(), host, Settings::new(250, false));
        assert_eq!(log.poll_interval(), Duration::from_millis(1000));
    }

    #[test]
    fn poll_interval_capped_at_max() {
        let host = Arc::new(FakeHost::new());
        let core = active_core(&host, 60_000);
        assert_eq!(core.poll_interval(), Duration::from_millis(5000));
        assert_eq!(core.set_poll_interval_ms(9000), 5000);
        assert_eq!(core.settings().poll_interval_ms(), 5000);
        assert_eq!(core.set_poll_interval_ms(5000), 5000);
    }

    /// Active scan whose first tick races a match restart.
    struct RestartMidTick {
        scan: ActiveScan,
        restarted: AtomicBool,
    }

    impl Strategy for RestartMidTick {
        fn name(&self) -> &'static str {
            self.scan.name()
        }

        fn poll_floor_ms(&self) -> u64 {
            self.scan.poll_floor_ms()
        }

        fn on_tick(&self, ctx: &TickContext<'_>) -> Vec<Candidate> {
            let candidates = self.scan.on_tick(ctx);
            if !self.restarted.swap(true, Ordering::SeqCst) {
                self.scan.on_match_end();
                self.scan.on_match_start(ctx.store);
            }
            candidates
        }

        fn on_inserted(&self, ctx: &TickContext<'_>, inserted: &[EndpointLabel]) {
            self.scan.on_inserted(ctx, inserted);
        }

        fn on_match_start(&self, store: &EndpointStore) {
            self.scan.on_match_start(store);
        }

        fn match_generation(&self) -> u64 {
            self.scan.match_generation()
        }
    }

    #[test]
    fn candidates_from_previous_match_are_dropped() {
        let host = Arc::new(
            FakeHost::new()
                .with_pid(42)
                .with_connections(vec![conn([1, 2, 3, 4], 7777, 42)]),
        );
        let core = DiscoveryCore::new(
            RestartMidTick {
                scan: ActiveScan::new("RocketLeague.exe"),
                restarted: AtomicBool::new(false),
            },
            Arc::clone(&host) as Arc<dyn Host>,
            Settings::new(250, false),
        );
        core.on_match_event(MatchEvent::Started);

        assert!(core.tick().is_empty());
        assert!(core.store().is_empty());

        // The new match is still scanning and picks up its own server.
        host.set_connections(vec![conn([5, 6, 7, 8], 7777, 42)]);
        assert_eq!(core.tick(), vec![EndpointLabel::new("5.6.7.8:7777")]);
    }

    #[test]
    fn tick_inserts_and_stops_after_first_find() {
        let host = Arc::new(
            FakeHost::new()
                .with_pid(42)
                .with_connections(vec![conn([1, 2, 3, 4], 7777, 42), conn([0, 0, 0, 0], 0, 42)]),
        );
        let core = active_core(&host, 250);
        core.on_match_event(MatchEvent::Started);

        let inserted = core.tick();
        assert_eq!(inserted, vec![EndpointLabel::new("1.2.3.4:7777")]);

        // Found: later connections in the same match are ignored.
        host.set_connections(vec![conn([5, 6, 7, 8], 7777, 42)]);
        assert!(core.tick().is_empty());
        assert_eq!(texts(&core), vec!["1.2.3.4:7777"]);
    }

    #[test]
    fn zero_address_never_inserted() {
        let host = Arc::new(
            FakeHost::new()
                .with_pid(42)
                .with_connections(vec![conn([0, 0, 0, 0], 7777, 42)]),
        );
        let core = active_core(&host, 250);
        core.on_match_event(MatchEvent::Started);
        for _ in 0..3 {
            core.tick();
        }
        assert!(core.store().is_empty());
    }

    #[test]
    fn reset_rearms_scan_during_match() {
        let host = Arc::new(
            FakeHost::new()
                .with_pid(42)
                .with_connections(vec![conn([1, 2, 3, 4], 7777, 42)]),
        );
        let core = active_core(&host, 250);
        core.on_match_event(MatchEvent::Started);
        core.tick();

        host.set_connections(vec![conn([5, 6, 7, 8], 7777, 42)]);
        core.reset();
        assert!(core.store().is_empty());
        assert_eq!(core.tick(), vec![EndpointLabel::new("5.6.7.8:7777")]);
    }

    #[test]
    fn new_match_clears_previous_endpoints() {
        let host = Arc::new(
            FakeHost::new()
                .with_pid(42)
                .with_connections(vec![conn([1, 2, 3, 4], 7777, 42)]),
        );
        let core = active_core(&host, 250);
        core.on_match_event(MatchEvent::Started);
        core.tick();
        core.on_match_event(MatchEvent::Ended);
        assert_eq!(texts(&core), vec!["1.2.3.4:7777"]);

        host.set_connections(vec![conn([5, 6, 7, 8], 7777, 42)]);
        core.on_match_event(MatchEvent::Started);
        core.tick();
        assert_eq!(texts(&core), vec!["5.6.7.8:7777"]);
    }

    #[test]
    fn on_discovered_receives_inserted_labels() {
        let host = Arc::new(
            FakeHost::new()
                .with_pid(42)
                .with_connections(vec![conn([1, 2, 3, 4], 7777, 42), conn([1, 2, 3, 4], 7777, 42)]),
        );
        let core = active_core(&host, 250);
        let count = Arc::new(AtomicUsize::new(0));
        let count2 = Arc::clone(&count);
        core.set_on_discovered(Arc::new(move |_label| {
            count2.fetch_add(1, Ordering::SeqCst);
        }));

        core.on_match_event(MatchEvent::Started);
        core.tick();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn keep_duplicates_setting_applies_next_tick() {
        let host = Arc::new(
            FakeHost::new()
                .with_pid(42)
                .with_connections(vec![conn([1, 2, 3, 4], 7777, 42), conn([1, 2, 3, 4], 7777, 42)]),
        );
        let core = active_core(&host, 250);
        core.set_keep_duplicates(true);
        core.on_match_event(MatchEvent::Started);
        core.tick();
        assert_eq!(texts(&core), vec!["1.2.3.4:7777", "1.2.3.4:7777"]);
    }

    #[test]
    fn log_rescan_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("Launch.log");
        std::fs::write(
            &path,
            "ServerName=\"Foo\"\nGameURL=\"1.2.3.4:7777\"\nsomething else\nGameURL=\"5.6.7.8:7777\"\n",
        )
        .unwrap();

        let host: Arc<dyn Host> = Arc::new(FakeHost::new().with_log_path(&path));
        let core = DiscoveryCore::new(LogTail::new(), host, Settings::new(1000, false));

        core.tick();
        let first = texts(&core);
        assert_eq!(first, vec!["Foo (5.6.7.8:7777)", "Foo (1.2.3.4:7777)"]);

        assert!(core.tick().is_empty());
        assert_eq!(texts(&core), first);
    }

    #[test]
    fn log_rescan_keeps_operator_selection() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("Launch.log");
        std::fs::write(&path, "ServerName=\"Foo\"\nGameURL=\"1.2.3.4:7777\"\n").unwrap();

        let host: Arc<dyn Host> = Arc::new(FakeHost::new().with_log_path(&path));
        let core = DiscoveryCore::new(LogTail::new(), host, Settings::new(1000, false));
        core.tick();
        core.store().set_selection(Some(0));
        assert_eq!(core.store().selected_address().as_deref(), Some("1.2.3.4"));

        std::fs::write(
            &path,
            "ServerName=\"Foo\"\nGameURL=\"1.2.3.4:7777\"\nGameURL=\"9.9.9.9:7777\"\n",
        )
        .unwrap();
        assert_eq!(core.tick(), vec![EndpointLabel::new("Foo (9.9.9.9:7777)")]);

        assert_eq!(core.store().selection(), Some(1));
        assert_eq!(core.store().selected_address().as_deref(), Some("1.2.3.4"));
        assert_eq!(core.view().labels[0].as_str(), "Foo (9.9.9.9:7777)");
    }

    #[test]
    fn log_strategy_ignores_match_events() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("Launch.log");
        std::fs::write(&path, "GameURL=\"1.2.3.4:7777\"\n").unwrap();

        let host: Arc<dyn Host> = Arc::new(FakeHost::new().with_log_path(&path));
        let core = DiscoveryCore::new(LogTail::new(), host, Settings::new(1000, false));
        core.tick();
        core.on_match_event(MatchEvent::Started);
        assert_eq!(texts(&core), vec!["1.2.3.4:7777"]);
    }

    #[tokio::test(start_paused = true)]
    async fn loop_ticks_on_interval() {
        let host = Arc::new(
            FakeHost::new()
                .with_pid(42)
                .with_connections(vec![conn([1, 2, 3, 4], 7777, 42)]),
        );
        let core = active_core(&host, 250);
        core.start().await.unwrap();
        assert!(core.is_running().await);

        core.on_match_event(MatchEvent::Started);
        // No tick yet: the loop sleeps first.
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(host.enumerations(), 0);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(texts(&core), vec!["1.2.3.4:7777"]);
        assert_eq!(host.enumerations(), 1);

        // Found: further ticks do not touch the connection table.
        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(host.enumerations(), 1);

        core.stop().await.unwrap();
        assert!(!core.is_running().await);
    }

    #[tokio::test(start_paused = true)]
    async fn loop_keeps_polling_until_process_appears() {
        let host = Arc::new(FakeHost::new().with_connections(vec![conn([1, 2, 3, 4], 7777, 42)]));
        let core = active_core(&host, 250);
        core.on_match_event(MatchEvent::Started);
        core.start().await.unwrap();

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert!(core.store().is_empty());

        host.set_pid(Some(42));
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(texts(&core), vec!["1.2.3.4:7777"]);

        core.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn stop_prevents_further_ticks() {
        let host = Arc::new(FakeHost::new().with_pid(42));
        let core = active_core(&host, 250);
        core.on_match_event(MatchEvent::Started);
        core.start().await.unwrap();

        tokio::time::sleep(Duration::from_millis(600)).await;
        let before = host.enumerations();
        assert_eq!(before, 2);

        core.stop().await.unwrap();
        tokio::time::sleep(Duration::from_millis(2000)).await;
        assert_eq!(host.enumerations(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn start_twice_is_rejected() {
        let host = Arc::new(FakeHost::new());
        let core = active_core(&host, 250);
        core.start().await.unwrap();
        assert!(matches!(core.start().await, Err(DiscoveryError::AlreadyRunning)));
        core.stop().await.unwrap();
        // Stopping again is a no-op.
        core.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn rescan_runs_tick_before_interval() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("Launch.log");
        std::fs::write(&path, "ServerName=\"Foo\" GameURL=\"1.2.3.4:7777\"\n").unwrap();

        let host: Arc<dyn Host> = Arc::new(FakeHost::new().with_log_path(&path));
        let core = DiscoveryCore::new(LogTail::new(), host, Settings::new(5000, false));

        assert!(matches!(core.request_rescan().await, Err(DiscoveryError::NotRunning)));

        core.start().await.unwrap();
        core.request_rescan().await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(texts(&core), vec!["Foo (1.2.3.4:7777)"]);

        core.stop().await.unwrap();
    }

    #[tokio::test]
    async fn rescan_unsupported_for_active_scan() {
        let host = Arc::new(FakeHost::new());
        let core = active_core(&host, 250);
        assert!(matches!(
            core.request_rescan().await,
            Err(DiscoveryError::RescanUnsupported("active-scan"))
        ));
    }

    #[test]
    fn view_selects_first_after_inserts() {
        let host = Arc::new(
            FakeHost::new()
                .with_pid(42)
                .with_connections(vec![conn([1, 2, 3, 4], 7777, 42), conn([5, 6, 7, 8], 7777, 42)]),
        );
        let core = active_core(&host, 250);
        core.on_match_event(MatchEvent::Started);
        core.tick();

        assert_eq!(core.store().selection(), None);
        let view = core.view();
        assert_eq!(view.selected, Some(0));
        assert_eq!(core.store().selected_address().as_deref(), Some("1.2.3.4"));

        core.reset();
        assert_eq!(core.store().selection(), None);
    }

    #[test]
    fn active_scan_phase_visible_through_strategy() {
        let scan = ActiveScan::new("x.exe");
        assert_eq!(scan.phase(), ScanPhase::Idle);
    }
}

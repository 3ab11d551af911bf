//! # PluginManager: lifecycle, lookup and forced runs.
//!
//! The [`PluginManager`] owns the loaded plugins ([`PluginRegistry`]), the
//! forced-run log ([`ProcessLedger`]), the shared [`ConcurrencyGate`] and the
//! event bus.
//!
//! ## Architecture
//! ```text
//! ManagerBuilder::build()
//!   └─► PluginRegistry::load_all(sources, factory, env)
//!
//! start()                      add_process(names, filter)
//!   └─► Plugin::start(token)     ├─► resolve target set (named ∪ filter)
//!         (one run loop each)    ├─► ProcessLedger::append → handle
//!                                └─► Plugin::force_run() for each target
//!
//! stop(blocking)
//!   ├─► publish ShutdownRequested
//!   ├─► cancel runtime token   → propagates to every plugin's child token
//!   └─► blocking: wait on per-plugin liveness, report on every count change
//!                 → publish AllStopped
//!
//! run_until_signal()
//!   ├─► start()
//!   ├─► select: OS signal │ every plugin stopped on its own
//!   └─► stop(false) + wait up to cfg.grace → GraceExceeded
//! ```
//!
//! ## Rules
//! - `stop` has no hard timeout; only `run_until_signal` applies `grace`.
//! - A stopped manager can be started again (fresh runtime token).

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::{ConfigSources, Filter, ManagerConfig};
use crate::error::{ManagerError, RuntimeError};
use crate::events::{Bus, Event, EventKind};
use crate::plugins::Plugin;

use super::builder::ManagerBuilder;
use super::gate::ConcurrencyGate;
use super::ledger::{ProcessLedger, ProcessRecord};
use super::registry::{LoadReport, PluginRegistry, PluginSelection};
use super::shutdown;

/// Manages a set of monitoring plugins.
pub struct PluginManager {
    cfg: ManagerConfig,
    gate: ConcurrencyGate,
    bus: Bus,
    registry: PluginRegistry,
    ledger: ProcessLedger,
    report: LoadReport,
    token: Mutex<CancellationToken>,
    stopping: AtomicBool,
    listener: Option<JoinHandle<()>>,
}

impl PluginManager {
    /// Loads plugins from `sources` with default settings and the command probe.
    ///
    /// Use [`PluginManager::builder`] for anything else.
    pub fn new(sources: ConfigSources) -> Result<Self, ManagerError> {
        ManagerBuilder::new(sources).build()
    }

    /// Returns a builder over `sources`.
    pub fn builder(sources: ConfigSources) -> ManagerBuilder {
        ManagerBuilder::new(sources)
    }

    pub(super) fn new_internal(
        cfg: ManagerConfig,
        gate: ConcurrencyGate,
        bus: Bus,
        registry: PluginRegistry,
        report: LoadReport,
        listener: Option<JoinHandle<()>>,
    ) -> Self {
        Self {
            cfg,
            gate,
            bus,
            registry,
            ledger: ProcessLedger::new(),
            report,
            token: Mutex::new(CancellationToken::new()),
            stopping: AtomicBool::new(false),
            listener,
        }
    }

    /// Effective configuration.
    pub fn config(&self) -> &ManagerConfig {
        &self.cfg
    }

    /// The gate shared by all plugins.
    pub fn gate(&self) -> &ConcurrencyGate {
        &self.gate
    }

    /// The event bus; subscribe to observe runtime events.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// What happened while loading plugins.
    pub fn load_report(&self) -> &LoadReport {
        &self.report
    }

    /// True between `stop` and the next `start`.
    pub fn is_stopping(&self) -> bool {
        self.stopping.load(Ordering::Acquire)
    }

    /// Spawns the run loop of every plugin. Returns how many were started.
    ///
    /// Plugins already running are left alone; plugins still finishing a
    /// previous stop are awaited and started again.
    pub async fn start(&self) -> usize {
        let token = {
            let mut token = self.token.lock();
            if token.is_cancelled() {
                *token = CancellationToken::new();
            }
            token.clone()
        };
        self.stopping.store(false, Ordering::Release);

        let mut started = 0;
        for plugin in self.registry.all().await {
            if plugin.is_terminating() {
                plugin.wait_stopped().await;
            }
            if plugin.start(&token) {
                started += 1;
            }
        }
        tracing::info!(started, "plugins started");
        started
    }

    /// Stops every plugin.
    ///
    /// With `blocking`, returns once no plugin is alive; otherwise returns
    /// right after requesting termination.
    pub async fn stop(&self, blocking: bool) {
        self.request_stop().await;
        if blocking {
            self.wait_stopped(|_| {}).await;
        }
    }

    /// Stops every plugin and waits, calling `progress` with the names of the
    /// plugins still alive each time their number changes.
    pub async fn stop_with_progress<F>(&self, progress: F)
    where
        F: FnMut(&[String]),
    {
        self.request_stop().await;
        self.wait_stopped(progress).await;
    }

    /// Returns the plugin called `name`.
    pub async fn get_plugin(&self, name: &str) -> Result<Arc<Plugin>, ManagerError> {
        self.registry.get(name).await
    }

    /// Returns every plugin, or only those matching `filter`.
    pub async fn get_plugins(&self, filter: Option<&Filter>) -> PluginSelection {
        self.registry.list(filter).await
    }

    /// Requests an immediate run of the named plugins and of those matching
    /// `filter`. Returns the handle of the new process record.
    ///
    /// Unknown names are logged and skipped. Fails with
    /// [`ManagerError::NoPluginsFound`] when nothing is selected, in which case
    /// no record is added.
    pub async fn add_process(
        &self,
        names: Option<&[&str]>,
        filter: Option<&Filter>,
    ) -> Result<usize, ManagerError> {
        let targets = self.resolve_targets(names.unwrap_or_default(), filter).await;
        if targets.is_empty() {
            return Err(ManagerError::NoPluginsFound);
        }

        let listed = targets
            .iter()
            .map(|p| p.name())
            .collect::<Vec<_>>()
            .join(", ");
        tracing::info!("Forcing run of {} plugins: {}", targets.len(), listed);

        let record = self.ledger.append(targets).await;
        for plugin in record.plugins() {
            self.bus.publish(
                Event::new(EventKind::ForcedRunRequested)
                    .with_plugin(plugin.name())
                    .with_handle(record.handle()),
            );
        }
        Ok(record.handle())
    }

    /// Returns the process record behind `handle`.
    pub async fn get_process(&self, handle: usize) -> Result<Arc<ProcessRecord>, ManagerError> {
        self.ledger.get(handle).await
    }

    /// Number of process records so far.
    pub async fn process_count(&self) -> usize {
        self.ledger.len().await
    }

    /// Runs as a daemon until a termination signal arrives.
    ///
    /// Starts the plugins, waits for SIGINT/SIGTERM/SIGQUIT (Ctrl-C elsewhere)
    /// or for every plugin to stop on its own, then stops and waits up to
    /// [`ManagerConfig::grace`].
    pub async fn run_until_signal(&self) -> Result<(), RuntimeError> {
        self.start().await;

        tokio::select! {
            res = shutdown::wait_for_shutdown_signal() => {
                let signal = res?;
                tracing::info!(%signal, "termination signal received");
                self.request_stop().await;
                self.wait_with_grace().await
            }
            _ = self.wait_stopped(|_| {}) => {
                tracing::warn!("every plugin stopped on its own");
                Ok(())
            }
        }
    }

    /// Publishes the request and terminates every registered plugin.
    async fn request_stop(&self) {
        self.stopping.store(true, Ordering::Release);
        self.bus.publish(Event::new(EventKind::ShutdownRequested));
        self.token.lock().cancel();
        for plugin in self.registry.all().await {
            plugin.terminate();
        }
    }

    /// Waits for every plugin's run loop to end.
    async fn wait_stopped<F>(&self, mut progress: F)
    where
        F: FnMut(&[String]),
    {
        let plugins = self.registry.all().await;
        let mut alive = plugins
            .iter()
            .filter(|p| p.is_alive())
            .map(|p| p.name().to_string())
            .collect::<BTreeSet<_>>();

        let mut pending = plugins
            .into_iter()
            .map(|plugin| async move {
                plugin.wait_stopped().await;
                plugin
            })
            .collect::<FuturesUnordered<_>>();

        let mut reported = pending.len();
        report_waiting(&alive, &mut reported, &mut progress);
        while let Some(plugin) = pending.next().await {
            if alive.remove(plugin.name()) {
                report_waiting(&alive, &mut reported, &mut progress);
            }
        }

        self.bus.publish(Event::new(EventKind::AllStopped));
    }

    /// Waits for every plugin within the configured grace period.
    async fn wait_with_grace(&self) -> Result<(), RuntimeError> {
        let Some(grace) = self.cfg.grace_limit() else {
            self.wait_stopped(|_| {}).await;
            return Ok(());
        };

        match tokio::time::timeout(grace, self.wait_stopped(|_| {})).await {
            Ok(()) => Ok(()),
            Err(_elapsed) => {
                let stuck = self
                    .registry
                    .all()
                    .await
                    .iter()
                    .filter(|p| p.is_alive())
                    .map(|p| p.name().to_string())
                    .collect::<Vec<_>>();
                self.bus
                    .publish(Event::new(EventKind::GraceExceeded).with_reason(stuck.join(", ")));
                Err(RuntimeError::GraceExceeded { grace, stuck })
            }
        }
    }

    /// Named plugins first (request order), then filter matches; no duplicates.
    async fn resolve_targets(&self, names: &[&str], filter: Option<&Filter>) -> Vec<Arc<Plugin>> {
        let mut seen = BTreeSet::new();
        let mut targets = Vec::new();

        for &name in names {
            match self.registry.get(name).await {
                Ok(plugin) => {
                    if seen.insert(name.to_string()) {
                        targets.push(plugin);
                    }
                }
                Err(_) => tracing::warn!(plugin = name, "unknown plugin in forced run, skipping"),
            }
        }

        if let Some(filter) = filter {
            for plugin in self.registry.list(Some(filter)).await.into_vec() {
                if seen.insert(plugin.name().to_string()) {
                    targets.push(plugin);
                }
            }
        }
        targets
    }
}

impl Drop for PluginManager {
    fn drop(&mut self) {
        self.token.lock().cancel();
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
    }
}

/// Logs and reports the plugins still alive when their number changed since
/// the last report. `reported` starts at the number of registered plugins.
fn report_waiting<F>(alive: &BTreeSet<String>, reported: &mut usize, progress: &mut F)
where
    F: FnMut(&[String]),
{
    if alive.len() == *reported {
        return;
    }
    *reported = alive.len();
    if alive.is_empty() {
        return;
    }
    let names = alive.iter().cloned().collect::<Vec<_>>();
    tracing::info!(
        "Waiting for {} plugins to shutdown: {}",
        names.len(),
        names.join(", ")
    );
    progress(&names);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Params;
    use crate::error::{ConfigError, ProbeError};
    use crate::plugins::{ProbeFn, ProbeOutput, ProbeRequest, ProbeStatus, SharedProbe};
    use serde_json::{json, Value};
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn sources(v: Value) -> ConfigSources {
        serde_json::from_value(v).unwrap()
    }

    fn ok_factory() -> SharedProbe {
        SharedProbe(ProbeFn::arc(|req: ProbeRequest| async move {
            Ok::<_, ProbeError>(ProbeOutput::ok(format!("{} fine", req.plugin)))
        }))
    }

    fn three_plugins() -> ConfigSources {
        sources(json!({
            "plugins": {
                "cpu": { "Template": "System" },
                "disk": { "Template": "System" },
                "http": { "Role": "web" },
                "off": { "Enabled": false }
            },
            "templates": {
                "BasePlugin": { "Role": "generic" },
                "System": { "Role": "system" }
            }
        }))
    }

    fn manager(src: ConfigSources) -> PluginManager {
        PluginManager::builder(src)
            .with_factory(ok_factory())
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn construction_requires_base_template() {
        let src = sources(json!({ "plugins": { "a": {} }, "templates": {} }));
        let err = PluginManager::builder(src)
            .with_factory(ok_factory())
            .build()
            .err()
            .unwrap();
        assert_eq!(err, ManagerError::Config(ConfigError::BasePluginTemplateNotFound));
    }

    #[tokio::test]
    async fn merge_precedence_reaches_plugin_params() {
        let src = sources(json!({
            "plugins": { "p": { "c": 5, "d": 6, "Template": "T" } },
            "templates": { "BasePlugin": { "a": 1, "b": 2 }, "T": { "b": 3, "c": 4 } }
        }));
        let mgr = manager(src);
        let plugin = mgr.get_plugin("p").await.unwrap();
        let expected: Params = serde_json::from_value(json!({
            "a": 1, "b": 3, "c": 5, "d": 6, "Template": "T"
        }))
        .unwrap();
        assert_eq!(plugin.params(), &expected);
    }

    #[tokio::test]
    async fn lookup_and_filtering() {
        let mgr = manager(three_plugins());
        assert_eq!(mgr.load_report().disabled, vec!["off".to_string()]);

        assert!(matches!(
            mgr.get_plugin("off").await,
            Err(ManagerError::NoSuchPlugin { .. })
        ));
        assert_eq!(mgr.get_plugins(None).await.names(), vec!["cpu", "disk", "http"]);
        assert_eq!(
            mgr.get_plugins(Some(&Filter::new("Role", "system"))).await.names(),
            vec!["cpu", "disk"]
        );
    }

    #[tokio::test]
    async fn add_process_resolves_union_and_assigns_handles() {
        let mgr = manager(three_plugins());

        let h1 = mgr
            .add_process(Some(&["http", "ghost"][..]), Some(&Filter::new("Role", "system")))
            .await
            .unwrap();
        assert_eq!(h1, 1);
        let record = mgr.get_process(1).await.unwrap();
        let names = record.plugins().iter().map(|p| p.name()).collect::<Vec<_>>();
        assert_eq!(names, vec!["http", "cpu", "disk"]);

        let h2 = mgr.add_process(Some(&["cpu", "cpu"][..]), None).await.unwrap();
        assert_eq!(h2, 2);
        assert_eq!(mgr.get_process(2).await.unwrap().plugins().len(), 1);

        assert!(matches!(
            mgr.get_process(0).await,
            Err(ManagerError::ProcessNotFound { handle: 0 })
        ));
        assert!(matches!(
            mgr.get_process(3).await,
            Err(ManagerError::ProcessNotFound { handle: 3 })
        ));
    }

    #[tokio::test]
    async fn empty_target_set_leaves_ledger_unchanged() {
        let mgr = manager(three_plugins());
        mgr.add_process(Some(&["cpu"][..]), None).await.unwrap();

        let err = mgr
            .add_process(Some(&["ghost"][..]), Some(&Filter::new("Role", "cache")))
            .await
            .unwrap_err();
        assert_eq!(err, ManagerError::NoPluginsFound);
        assert_eq!(mgr.add_process(None, None).await.unwrap_err(), ManagerError::NoPluginsFound);
        assert_eq!(mgr.process_count().await, 1);
    }

    #[tokio::test]
    async fn add_process_reforces_even_if_already_forced() {
        let mgr = manager(three_plugins());
        let cpu = mgr.get_plugin("cpu").await.unwrap();

        mgr.add_process(Some(&["cpu"][..]), None).await.unwrap();
        assert!(cpu.force());
        assert!(cpu.forced_result().is_none());

        mgr.add_process(Some(&["cpu"][..]), None).await.unwrap();
        assert!(cpu.force());
        assert!(cpu.forced_result().is_none());
    }

    #[tokio::test]
    async fn forced_process_completes_after_start() {
        let mgr = manager(three_plugins());
        mgr.start().await;

        let handle = mgr
            .add_process(None, Some(&Filter::new("Role", "system")))
            .await
            .unwrap();
        let record = mgr.get_process(handle).await.unwrap();
        let results = tokio::time::timeout(Duration::from_secs(5), record.wait())
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        for (name, result) in results {
            let result = result.unwrap();
            assert_eq!(result.status, ProbeStatus::Ok);
            assert_eq!(result.message, format!("{name} fine"));
            assert!(result.forced);
        }
        assert!(record.is_finished());
        mgr.stop(true).await;
    }

    #[tokio::test]
    async fn blocking_stop_waits_for_every_plugin() {
        let mgr = manager(three_plugins());
        assert_eq!(mgr.start().await, 3);
        let plugins = mgr.get_plugins(None).await.into_vec();
        assert!(plugins.iter().all(|p| p.is_alive()));

        let mut reports = Vec::new();
        mgr.stop_with_progress(|alive| reports.push(alive.len())).await;

        assert!(mgr.is_stopping());
        assert!(plugins.iter().all(|p| !p.is_alive()));
        assert_eq!(reports, vec![2, 1]);
    }

    #[tokio::test]
    async fn non_blocking_stop_returns_immediately() {
        let src = sources(json!({
            "plugins": { "slow": {} },
            "templates": { "BasePlugin": {} }
        }));
        let probe = ProbeFn::arc(|_req: ProbeRequest| async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok::<_, ProbeError>(ProbeOutput::ok("late"))
        });
        let mgr = PluginManager::builder(src)
            .with_factory(SharedProbe(probe))
            .build()
            .unwrap();
        mgr.start().await;
        mgr.add_process(Some(&["slow"][..]), None).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        mgr.stop(false).await;
        let slow = mgr.get_plugin("slow").await.unwrap();
        assert!(slow.is_alive());

        slow.wait_stopped().await;
        assert!(!slow.is_alive());
    }

    #[tokio::test]
    async fn restart_after_stop() {
        let mgr = manager(three_plugins());
        mgr.start().await;
        mgr.stop(true).await;
        assert_eq!(mgr.start().await, 3);
        assert!(!mgr.is_stopping());
        mgr.stop(true).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn gate_bounds_runs_in_flight() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let check = {
            let (in_flight, peak) = (in_flight.clone(), peak.clone());
            ProbeFn::arc(move |_req: ProbeRequest| {
                let (in_flight, peak) = (in_flight.clone(), peak.clone());
                async move {
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    Ok::<_, ProbeError>(ProbeOutput::ok("done"))
                }
            })
        };

        let plugins = (0..10)
            .map(|i| (format!("p{i}"), json!({ "Interval": 0.05, "Group": i % 2 })))
            .collect::<serde_json::Map<_, _>>();
        let src = sources(json!({
            "plugins": plugins,
            "templates": { "BasePlugin": {} }
        }));
        let mgr = PluginManager::builder(src)
            .with_factory(SharedProbe(check))
            .with_gate(ConcurrencyGate::new(2))
            .build()
            .unwrap();
        mgr.start().await;

        let handle = mgr
            .add_process(None, Some(&Filter::new("Enabled", true)))
            .await;
        assert_eq!(handle, Err(ManagerError::NoPluginsFound));

        let names = (0..10).map(|i| format!("p{i}")).collect::<Vec<_>>();
        let refs = names.iter().map(String::as_str).collect::<Vec<_>>();
        let mut handles = vec![mgr.add_process(Some(refs.as_slice()), None).await.unwrap()];
        for group in [0, 1, 0] {
            let filter = Filter::new("Group", group);
            handles.push(mgr.add_process(None, Some(&filter)).await.unwrap());
        }
        handles.push(mgr.add_process(Some(&refs[..3]), None).await.unwrap());
        assert_eq!(handles, vec![1, 2, 3, 4, 5]);

        for handle in handles {
            let record = mgr.get_process(handle).await.unwrap();
            let results = tokio::time::timeout(Duration::from_secs(10), record.wait())
                .await
                .unwrap();
            assert!(results.iter().all(|(_, r)| r.as_ref().is_some_and(|r| r.forced)));
        }

        assert!(peak.load(Ordering::SeqCst) <= 2);
        mgr.stop(true).await;
        assert_eq!(mgr.gate().in_flight(), 0);
    }

    #[tokio::test]
    async fn stop_terminates_plugins_started_elsewhere() {
        let mgr = manager(three_plugins());
        let cpu = mgr.get_plugin("cpu").await.unwrap();
        assert!(cpu.start(&CancellationToken::new()));

        tokio::time::timeout(Duration::from_secs(2), mgr.stop(true))
            .await
            .unwrap();
        assert!(!cpu.is_alive());
    }

    fn slow_manager(cfg: ManagerConfig) -> PluginManager {
        let src = sources(json!({
            "plugins": { "slow": {} },
            "templates": { "BasePlugin": {} }
        }));
        let check = ProbeFn::arc(|_req: ProbeRequest| async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok::<_, ProbeError>(ProbeOutput::ok("late"))
        });
        PluginManager::builder(src)
            .with_config(cfg)
            .with_factory(SharedProbe(check))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn start_after_non_blocking_stop_restarts_draining_plugins() {
        let mgr = slow_manager(ManagerConfig::default());
        mgr.start().await;
        mgr.add_process(Some(&["slow"][..]), None).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        mgr.stop(false).await;
        let slow = mgr.get_plugin("slow").await.unwrap();
        assert!(slow.is_terminating());

        assert_eq!(mgr.start().await, 1);
        assert!(!mgr.is_stopping());
        assert!(slow.is_alive());
        assert!(!slow.is_terminating());

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(slow.is_alive());
        mgr.stop(true).await;
        assert!(!slow.is_alive());
    }

    #[tokio::test]
    async fn grace_exceeded_names_stuck_plugins() {
        let cfg = ManagerConfig {
            grace: Duration::from_millis(30),
            ..ManagerConfig::default()
        };
        let mgr = slow_manager(cfg);
        mgr.start().await;
        mgr.add_process(Some(&["slow"][..]), None).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        mgr.request_stop().await;
        match mgr.wait_with_grace().await {
            Err(RuntimeError::GraceExceeded { grace, stuck }) => {
                assert_eq!(grace, Duration::from_millis(30));
                assert_eq!(stuck, vec!["slow".to_string()]);
            }
            other => panic!("expected grace exceeded, got {other:?}"),
        }

        let slow = mgr.get_plugin("slow").await.unwrap();
        slow.wait_stopped().await;
    }

    #[tokio::test]
    async fn run_until_signal_returns_when_every_plugin_dies() {
        let src = sources(json!({
            "plugins": { "broken": { "Interval": 60 } },
            "templates": { "BasePlugin": {} }
        }));
        let check = ProbeFn::arc(|_req: ProbeRequest| async move {
            Err::<ProbeOutput, _>(ProbeError::Fatal {
                error: "check binary missing".into(),
            })
        });
        let mgr = PluginManager::builder(src)
            .with_factory(SharedProbe(check))
            .build()
            .unwrap();

        let res = tokio::time::timeout(Duration::from_secs(5), mgr.run_until_signal())
            .await
            .unwrap();
        assert!(res.is_ok());

        let broken = mgr.get_plugin("broken").await.unwrap();
        assert!(!broken.is_alive());
        assert_eq!(broken.last_result().unwrap().error, Some("probe_fatal"));
    }
}

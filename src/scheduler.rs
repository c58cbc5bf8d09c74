// src/scheduler.rs
//
// Reporting cadence for one agent process. Two timers drive everything: the
// heartbeat timer (which also decides when a full report is due) and the
// command poll timer. Full reports run as a spawned task behind a
// single-flight lock so overlapping triggers collapse into one run.
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::collectors::CollectorSet;
use crate::dispatcher::CommandDispatcher;
use crate::models::agent::AgentIdentity;
use crate::transport::Transport;

pub struct ReportScheduler {
    identity: AgentIdentity,
    heartbeat_interval: Duration,
    full_report_interval: Duration,
    poll_interval: Duration,
    report_path: PathBuf,
    transport: Arc<Transport>,
    collectors: Arc<CollectorSet>,
    dispatcher: CommandDispatcher,
    last_full_report: Arc<Mutex<Option<Instant>>>,
    report_flight: Arc<AsyncMutex<()>>,
}

impl ReportScheduler {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        identity: AgentIdentity,
        heartbeat_interval: Duration,
        full_report_interval: Duration,
        poll_interval: Duration,
        report_path: PathBuf,
        transport: Arc<Transport>,
        collectors: Arc<CollectorSet>,
        dispatcher: CommandDispatcher,
    ) -> Self {
        ReportScheduler {
            identity,
            heartbeat_interval,
            full_report_interval,
            poll_interval,
            report_path,
            transport,
            collectors,
            dispatcher,
            last_full_report: Arc::new(Mutex::new(None)),
            report_flight: Arc::new(AsyncMutex::new(())),
        }
    }

    /// Drive the timers forever. An immediate first tick means the server
    /// hears from a fresh agent right away.
    pub async fn run(self) {
        let mut heartbeat = tokio::time::interval(self.heartbeat_interval);
        let mut poll = tokio::time::interval(self.poll_interval);

        loop {
            tokio::select! {
                _ = heartbeat.tick() => self.heartbeat_cycle().await,
                _ = poll.tick() => self.dispatcher.poll_once().await,
            }
        }
    }

    async fn heartbeat_cycle(&self) {
        let payload = self.collectors.build_heartbeat(&self.identity).await;
        match self.transport.post_heartbeat(&payload).await {
            Ok(()) => {
                debug!("heartbeat delivered");
                // A dead control plane gets no reports either; only a
                // successful heartbeat can trigger a full report.
                if self.full_report_due() {
                    self.spawn_full_report();
                }
            }
            Err(e) => warn!("heartbeat failed: {}", e),
        }
    }

    fn full_report_due(&self) -> bool {
        match *self.last_full_report.lock().unwrap() {
            None => true,
            Some(at) => at.elapsed() >= self.full_report_interval,
        }
    }

    /// Take the single-flight slot if it is free. Returning `None` means a
    /// report is already running and this trigger should be absorbed.
    fn try_acquire_flight(&self) -> Option<OwnedMutexGuard<()>> {
        self.report_flight.clone().try_lock_owned().ok()
    }

    fn spawn_full_report(&self) {
        let Some(guard) = self.try_acquire_flight() else {
            debug!("full report already in flight, absorbing trigger");
            return;
        };

        let identity = self.identity.clone();
        let transport = self.transport.clone();
        let collectors = self.collectors.clone();
        let report_path = self.report_path.clone();
        let last = self.last_full_report.clone();

        tokio::spawn(async move {
            let _guard = guard;
            run_full_report(&identity, &collectors, &transport, &report_path).await;
            // The clock restarts after the attempt finishes, success or not,
            // so a struggling collector set cannot tighten its own cadence.
            *last.lock().unwrap() = Some(Instant::now());
        });
    }
}

async fn run_full_report(
    identity: &AgentIdentity,
    collectors: &CollectorSet,
    transport: &Transport,
    report_path: &std::path::Path,
) {
    info!("collecting full system report");
    let bundle = collectors.collect_full(identity).await;

    match serde_json::to_string_pretty(&bundle) {
        Ok(serialized) => {
            if let Err(e) = tokio::fs::write(report_path, serialized).await {
                warn!("failed to write {}: {}", report_path.display(), e);
            }
        }
        Err(e) => warn!("failed to serialize full report: {}", e),
    }

    match transport.post_report(&bundle).await {
        Ok(()) => info!("full report delivered"),
        Err(e) => warn!("full report upload failed: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EndpointConfig;
    use crate::scanner::TcpConnectScanner;

    fn scheduler_with_interval(full_report_interval: Duration) -> ReportScheduler {
        let identity = AgentIdentity {
            agent_id: "AGENT001".into(),
            hostname: "host-1".into(),
            username: "alice".into(),
            os: "Linux".into(),
        };
        let endpoints = EndpointConfig {
            heartbeat_url: "http://127.0.0.1:1/hb".into(),
            full_report_url: "http://127.0.0.1:1/report".into(),
            commands_url: "http://127.0.0.1:1/commands".into(),
            results_url: "http://127.0.0.1:1/results".into(),
        };
        let transport = Arc::new(Transport::new(endpoints, "AGENT001".into()).unwrap());
        let collectors = Arc::new(CollectorSet::new().unwrap());
        let dispatcher = CommandDispatcher::new(
            identity.clone(),
            transport.clone(),
            Arc::new(TcpConnectScanner::default()),
        );
        ReportScheduler::new(
            identity,
            Duration::from_secs(300),
            full_report_interval,
            Duration::from_secs(60),
            PathBuf::from("full_system_report.json"),
            transport,
            collectors,
            dispatcher,
        )
    }

    #[tokio::test]
    async fn first_report_is_always_due() {
        let scheduler = scheduler_with_interval(Duration::from_secs(3600));
        assert!(scheduler.full_report_due());
    }

    #[tokio::test]
    async fn fresh_report_is_not_due_again() {
        let scheduler = scheduler_with_interval(Duration::from_secs(3600));
        *scheduler.last_full_report.lock().unwrap() = Some(Instant::now());
        assert!(!scheduler.full_report_due());
    }

    #[tokio::test]
    async fn stale_report_is_due() {
        let scheduler = scheduler_with_interval(Duration::from_millis(1));
        *scheduler.last_full_report.lock().unwrap() = Some(Instant::now());
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(scheduler.full_report_due());
    }

    #[tokio::test]
    async fn failed_heartbeat_never_triggers_a_report() {
        // Port 1 refuses connections, so the heartbeat POST fails and the
        // cycle must stop before the report-due check.
        let scheduler = scheduler_with_interval(Duration::from_secs(3600));
        assert!(scheduler.full_report_due());

        scheduler.heartbeat_cycle().await;

        assert!(scheduler.last_full_report.lock().unwrap().is_none());
        // No report task took the single-flight slot.
        assert!(scheduler.try_acquire_flight().is_some());
    }

    #[tokio::test]
    async fn in_flight_report_absorbs_further_triggers() {
        let scheduler = scheduler_with_interval(Duration::from_secs(3600));
        let held = scheduler.try_acquire_flight().unwrap();
        for _ in 0..5 {
            assert!(scheduler.try_acquire_flight().is_none());
        }
        drop(held);
        assert!(scheduler.try_acquire_flight().is_some());
    }
}

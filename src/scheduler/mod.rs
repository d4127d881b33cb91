use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::JobsConfig;
use crate::jobs::{self, JobContext};

/// One schedulable job: the in-process equivalent of a crontab line.
#[derive(Debug, Clone)]
pub struct JobSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub interval: Duration,
    pub enabled: bool,
}

/// The job catalog, built from configuration. Names double as the dispatch
/// keys in `jobs::run_job`.
pub fn catalog(config: &JobsConfig) -> Vec<JobSpec> {
    vec![
        JobSpec {
            name: jobs::balance_sync::NAME,
            description: "Sync account balance and notify on significant changes",
            interval: Duration::from_secs(config.balance_sync.interval_secs),
            enabled: config.balance_sync.enabled,
        },
        JobSpec {
            name: jobs::position_sync::NAME,
            description: "Refresh position P&L and fire milestone notifications",
            interval: Duration::from_secs(config.position_sync.interval_secs),
            enabled: config.position_sync.enabled,
        },
        JobSpec {
            name: jobs::price_monitor::NAME,
            description: "Check watchlist entries against live prices",
            interval: Duration::from_secs(config.price_monitor.interval_secs),
            enabled: config.price_monitor.enabled,
        },
        JobSpec {
            name: jobs::order_status::NAME,
            description: "Poll exchange status of pending orders",
            interval: Duration::from_secs(config.order_status.interval_secs),
            enabled: config.order_status.enabled,
        },
        JobSpec {
            name: jobs::limit_order_monitor::NAME,
            description: "Watch pending limit orders for entry triggers",
            interval: Duration::from_secs(config.limit_order_monitor.interval_secs),
            enabled: config.limit_order_monitor.enabled,
        },
        JobSpec {
            name: jobs::target_monitor::NAME,
            description: "Check open positions for target and stop-loss conditions",
            interval: Duration::from_secs(config.target_monitor.interval_secs),
            enabled: config.target_monitor.enabled,
        },
        JobSpec {
            name: jobs::sltp_guard::NAME,
            description: "Create missing exchange-native SL/TP trigger orders",
            interval: Duration::from_secs(config.sltp_guard.interval_secs),
            enabled: config.sltp_guard.enabled,
        },
        JobSpec {
            name: jobs::signal_automation::NAME,
            description: "Convert active signals into exchange orders",
            interval: Duration::from_secs(config.signal_automation.interval_secs),
            enabled: config.signal_automation.enabled,
        },
    ]
}

/// Runs each enabled job on its own tokio interval. Ticks of one job are
/// strictly sequential: a run that overshoots its interval delays the next
/// tick instead of overlapping it.
pub struct Scheduler {
    ctx: Arc<JobContext>,
}

impl Scheduler {
    pub fn new(ctx: Arc<JobContext>) -> Self {
        Self { ctx }
    }

    pub fn spawn_all(&self, specs: &[JobSpec]) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::new();

        for spec in specs {
            if !spec.enabled {
                info!(job = spec.name, "Job disabled, not scheduling");
                continue;
            }

            info!(
                job = spec.name,
                interval_secs = spec.interval.as_secs(),
                "Scheduling job"
            );

            let ctx = Arc::clone(&self.ctx);
            let name = spec.name;
            let period = spec.interval;

            handles.push(tokio::spawn(async move {
                let mut interval = tokio::time::interval(period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

                loop {
                    interval.tick().await;
                    let started = std::time::Instant::now();
                    match jobs::run_job(name, &ctx).await {
                        Ok(()) => {
                            debug!(
                                job = name,
                                elapsed_ms = started.elapsed().as_millis() as u64,
                                "Job run complete"
                            );
                        }
                        Err(e) => {
                            warn!(job = name, "Job run failed: {}", e);
                        }
                    }
                }
            }));
        }

        handles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JobsConfig;

    #[test]
    fn test_catalog_covers_all_jobs() {
        let specs = catalog(&JobsConfig::default());
        assert_eq!(specs.len(), 8);

        let names: Vec<&str> = specs.iter().map(|s| s.name).collect();
        assert!(names.contains(&"balance-sync"));
        assert!(names.contains(&"position-sync"));
        assert!(names.contains(&"price-monitor"));
        assert!(names.contains(&"order-status"));
        assert!(names.contains(&"limit-order-monitor"));
        assert!(names.contains(&"target-monitor"));
        assert!(names.contains(&"sltp-guard"));
        assert!(names.contains(&"signal-automation"));
    }

    #[test]
    fn test_catalog_respects_config() {
        let mut config = JobsConfig::default();
        config.price_monitor.enabled = false;
        config.balance_sync.interval_secs = 900;

        let specs = catalog(&config);
        let price = specs.iter().find(|s| s.name == "price-monitor").unwrap();
        assert!(!price.enabled);
        let balance = specs.iter().find(|s| s.name == "balance-sync").unwrap();
        assert_eq!(balance.interval, Duration::from_secs(900));
    }
}

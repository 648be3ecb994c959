//! Background job host: the publication sweep and the counter
//! reconciliation pass.

mod scheduler;

pub use scheduler::{Scheduler, SchedulerConfig};

use chrono::Utc;

use capsule_core::service::PostService;

/// Wire up and start the background jobs. Returns the running scheduler so
/// the caller can keep it alive; `None` when disabled or failed to start
/// (the HTTP server still runs, with the manual trigger as fallback).
pub async fn start(service: PostService) -> Option<Scheduler> {
    let config = SchedulerConfig::from_env();
    if !config.enabled {
        tracing::info!("Scheduler disabled");
        return None;
    }

    let scheduler = match Scheduler::new(config.clone()).await {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Failed to initialize scheduler");
            return None;
        }
    };

    let sweep_service = service.clone();
    let registered = scheduler
        .add_interval(config.sweep_interval, move || {
            let service = sweep_service.clone();
            async move {
                // Errors are logged and retried on the next tick, never fatal.
                if let Err(e) = service.publish_due(Utc::now()).await {
                    tracing::error!(error = %e, "Publication sweep failed; retrying on next tick");
                }
            }
        })
        .await;
    if let Err(e) = registered {
        tracing::error!(error = %e, "Failed to register publication sweep");
    }

    let reconcile_service = service;
    let registered = scheduler
        .add_cron(&config.reconcile_cron, move || {
            let service = reconcile_service.clone();
            async move {
                match service.reconcile_counters().await {
                    Ok(report) if report.repaired > 0 || report.failed > 0 => {
                        tracing::warn!(
                            scanned = report.scanned,
                            repaired = report.repaired,
                            failed = report.failed,
                            "Counter reconciliation finished"
                        );
                    }
                    Ok(report) => {
                        tracing::debug!(scanned = report.scanned, "Counters consistent");
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Counter reconciliation failed");
                    }
                }
            }
        })
        .await;
    if let Err(e) = registered {
        tracing::error!(error = %e, "Failed to register counter reconciliation");
    }

    match scheduler.start().await {
        Ok(()) => Some(scheduler),
        Err(e) => {
            tracing::error!(error = %e, "Failed to start scheduler");
            None
        }
    }
}

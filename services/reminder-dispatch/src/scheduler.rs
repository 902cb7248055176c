//! Reminder Scheduler
//!
//! Fires the reminder sweep on a cron schedule in local time. Fire times
//! missed while the process was down are not caught up. Only one sweep can
//! be active at a time, whether it was started by the timer or by hand.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Local};
use cron::Schedule;
use serde::Serialize;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tracing::{debug, info, warn};

use vtrack_utils::{log_error, VtrackError};

use crate::service::{ReminderService, SweepReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerState {
    Idle,
    Running,
    Stopped,
}

#[derive(Clone)]
pub struct ReminderScheduler {
    service: ReminderService,
    schedule: Schedule,
    sweep_lock: Arc<Mutex<()>>,
    sweeping: Arc<AtomicBool>,
    shutdown: Arc<watch::Sender<bool>>,
    timer: Arc<std::sync::Mutex<Option<JoinHandle<()>>>>,
}

impl ReminderScheduler {
    pub fn new(service: ReminderService, expression: &str) -> Result<Self> {
        let schedule = Schedule::from_str(expression).map_err(|e| {
            VtrackError::configuration(format!("Invalid reminder schedule '{}': {}", expression, e))
        })?;
        let (shutdown, _) = watch::channel(false);

        Ok(Self {
            service,
            schedule,
            sweep_lock: Arc::new(Mutex::new(())),
            sweeping: Arc::new(AtomicBool::new(false)),
            shutdown: Arc::new(shutdown),
            timer: Arc::new(std::sync::Mutex::new(None)),
        })
    }

    /// Spawns the timer task. Calling it on a started scheduler is a no-op.
    pub fn start(&self) {
        let mut timer = match self.timer.lock() {
            Ok(timer) => timer,
            Err(poisoned) => poisoned.into_inner(),
        };
        if timer.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return;
        }

        self.shutdown.send_replace(false);
        let shutdown = self.shutdown.subscribe();
        let scheduler = self.clone();
        *timer = Some(tokio::spawn(scheduler.run_timer(shutdown)));
        info!("Reminder scheduler started");
    }

    /// Stops the timer. A sweep already in progress finishes on its own.
    pub async fn stop(&self) {
        self.shutdown.send_replace(true);
        let handle = match self.timer.lock() {
            Ok(mut timer) => timer.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                log_error!(e, "Reminder timer task ended abnormally");
            }
        }
        info!("Reminder scheduler stopped");
    }

    pub fn state(&self) -> SchedulerState {
        if self.sweeping.load(Ordering::Acquire) {
            return SchedulerState::Running;
        }
        let timer_alive = match self.timer.lock() {
            Ok(timer) => timer.as_ref().is_some_and(|handle| !handle.is_finished()),
            Err(_) => false,
        };
        if timer_alive {
            SchedulerState::Idle
        } else {
            SchedulerState::Stopped
        }
    }

    pub fn next_fire_time(&self) -> Option<DateTime<Local>> {
        self.schedule.upcoming(Local).next()
    }

    /// Runs a sweep for today unless one is already active, in which case
    /// `None` is returned immediately.
    ///
    /// The sweep runs on its own task, so it completes even if the caller
    /// stops waiting for it.
    pub async fn run_now(&self) -> Option<Result<SweepReport>> {
        let guard = self.sweep_lock.clone().try_lock_owned().ok()?;
        self.sweeping.store(true, Ordering::Release);
        let flag = SweepingFlag(self.sweeping.clone());
        let service = self.service.clone();

        let sweep = tokio::spawn(async move {
            let _guard = guard;
            let _flag = flag;
            service.run_sweep(Local::now().date_naive()).await
        });

        Some(match sweep.await {
            Ok(result) => result,
            Err(e) => Err(anyhow!(VtrackError::internal(format!(
                "Reminder sweep task ended abnormally: {}",
                e
            )))),
        })
    }

    async fn run_timer(self, mut shutdown: watch::Receiver<bool>) {
        let mut cursor = Local::now();

        loop {
            let Some(next) = self.schedule.after(&cursor).next() else {
                warn!("Reminder schedule has no further fire times");
                break;
            };
            let until = (next - Local::now())
                .to_std()
                .unwrap_or(Duration::ZERO);
            debug!(next = %next, "Next reminder sweep scheduled");

            tokio::select! {
                _ = tokio::time::sleep(until) => {}
                _ = shutdown.changed() => break,
            }

            cursor = next.max(Local::now());
            let scheduler = self.clone();
            tokio::spawn(async move { scheduler.fire().await });
        }
    }

    async fn fire(&self) {
        match self.run_now().await {
            None => warn!("Previous reminder sweep still running, skipping this fire time"),
            Some(Err(e)) => log_error!(e, "Scheduled reminder sweep failed"),
            Some(Ok(report)) => debug!(run_id = %report.run_id, "Scheduled reminder sweep done"),
        }
    }
}

/// Clears the running flag when the sweep task ends, however it ends.
struct SweepingFlag(Arc<AtomicBool>);

impl Drop for SweepingFlag {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template_engine::ReminderTemplates;
    use crate::testing::{GatedMailer, MemoryMailer, MemoryStore};
    use chrono::Duration as ChronoDuration;
    use uuid::Uuid;
    use vtrack_models::{Document, DocumentType, ReminderCandidate, User};

    fn service_with(store: Arc<MemoryStore>, mailer: Arc<dyn crate::smtp_client::MailTransport>) -> ReminderService {
        ReminderService::new(store, mailer, ReminderTemplates::default(), 4)
    }

    #[test]
    fn test_rejects_invalid_expression() {
        let service = service_with(Arc::new(MemoryStore::default()), Arc::new(MemoryMailer::default()));
        let Err(err) = ReminderScheduler::new(service, "not a cron") else {
            panic!("expression should be rejected");
        };
        let code = err.downcast_ref::<VtrackError>().map(VtrackError::error_code);
        assert_eq!(code, Some("CONFIGURATION_ERROR"));
    }

    #[tokio::test]
    async fn test_daily_schedule_fires_at_eight() {
        let service = service_with(Arc::new(MemoryStore::default()), Arc::new(MemoryMailer::default()));
        let scheduler = ReminderScheduler::new(service, "0 0 8 * * *").unwrap();
        let next = scheduler.next_fire_time().unwrap();
        assert_eq!(next.format("%H:%M:%S").to_string(), "08:00:00");
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
    }

    #[tokio::test]
    async fn test_run_now_is_single_flight() {
        let today = Local::now().date_naive();
        let store = Arc::new(MemoryStore::default());
        let document = Document::new(Uuid::new_v4(), DocumentType::Insurance)
            .with_expiry(today + ChronoDuration::days(2));
        store.add_user(
            User::new("Asha", "asha@example.com"),
            vec![ReminderCandidate::new(document, "KA01AB1234")],
        );
        let mailer = Arc::new(GatedMailer::default());
        let scheduler =
            ReminderScheduler::new(service_with(store.clone(), mailer.clone()), "0 0 8 * * *").unwrap();

        let first = {
            let scheduler = scheduler.clone();
            tokio::spawn(async move { scheduler.run_now().await })
        };
        while scheduler.state() != SchedulerState::Running {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        assert!(scheduler.run_now().await.is_none());

        mailer.release.notify_one();
        let report = first.await.unwrap().unwrap().unwrap();
        assert_eq!(report.emails_sent, 1);
        assert_eq!(store.logs().len(), 1);
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
    }

    #[tokio::test]
    async fn test_timer_fires_and_stops() {
        let today = Local::now().date_naive();
        let store = Arc::new(MemoryStore::default());
        let document = Document::new(Uuid::new_v4(), DocumentType::Puc)
            .with_expiry(today - ChronoDuration::days(1));
        store.add_user(
            User::new("Ravi", "ravi@example.com"),
            vec![ReminderCandidate::new(document, "MH12CD5678")],
        );
        let mailer = Arc::new(MemoryMailer::default());
        let scheduler =
            ReminderScheduler::new(service_with(store.clone(), mailer.clone()), "* * * * * *").unwrap();

        scheduler.start();
        assert_ne!(scheduler.state(), SchedulerState::Stopped);
        tokio::time::sleep(Duration::from_millis(2500)).await;
        scheduler.stop().await;

        assert_eq!(scheduler.state(), SchedulerState::Stopped);
        // several fire times passed, the document was mailed once
        assert_eq!(mailer.sent().len(), 1);
        assert_eq!(store.logs().len(), 1);
    }

    #[tokio::test]
    async fn test_sweep_finishes_after_caller_gives_up() {
        let today = Local::now().date_naive();
        let store = Arc::new(MemoryStore::default());
        let document = Document::new(Uuid::new_v4(), DocumentType::Fitness)
            .with_expiry(today + ChronoDuration::days(5));
        store.add_user(
            User::new("Meera", "meera@example.com"),
            vec![ReminderCandidate::new(document, "TN09EF4321")],
        );
        let mailer = Arc::new(GatedMailer::default());
        let scheduler =
            ReminderScheduler::new(service_with(store.clone(), mailer.clone()), "0 0 8 * * *").unwrap();

        let abandoned = tokio::time::timeout(Duration::from_millis(100), scheduler.run_now()).await;
        assert!(abandoned.is_err());
        assert_eq!(scheduler.state(), SchedulerState::Running);

        mailer.release.notify_one();
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while scheduler.state() == SchedulerState::Running {
            assert!(tokio::time::Instant::now() < deadline, "sweep never finished");
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        assert_eq!(scheduler.state(), SchedulerState::Stopped);
        assert_eq!(store.logs().len(), 1);
        // the lock was released with the finished sweep
        let next = scheduler.run_now().await.unwrap().unwrap();
        assert_eq!(next.emails_sent, 0);
    }

    #[tokio::test]
    async fn test_timer_survives_a_failed_sweep() {
        let today = Local::now().date_naive();
        let store = Arc::new(MemoryStore::default());
        let document = Document::new(Uuid::new_v4(), DocumentType::Tax)
            .with_expiry(today + ChronoDuration::days(1));
        store.add_user(
            User::new("Kiran", "kiran@example.com"),
            vec![ReminderCandidate::new(document, "DL3CAB0099")],
        );
        store.fail_list_users(1);
        let mailer = Arc::new(MemoryMailer::default());
        let scheduler =
            ReminderScheduler::new(service_with(store.clone(), mailer.clone()), "* * * * * *").unwrap();

        scheduler.start();
        tokio::time::sleep(Duration::from_millis(3500)).await;
        scheduler.stop().await;

        assert_eq!(store.list_users_failures(), 1);
        assert_eq!(mailer.sent().len(), 1);
        assert_eq!(store.logs().len(), 1);
    }
}

//! The suspension service: creation, expiry, manual override, recovery.
//!
//! Everything funnels through one reconciliation path, `execute_lift`,
//! whose first step is the store's conditional deactivate. That write is
//! the single serialization point: whichever of a firing timer or a manual
//! override reaches it first wins the record and owns the external lift
//! and the notification; the loser sees `None` and stops. Timer
//! cancellation is only an optimization on top of this.

use crate::registry::TimerRegistry;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use warden_core::{
    ActorId, LiftCause, LiftNotice, NotificationSink, RestrictionGateway, Result, ScopeId,
    SubjectId, SuspensionId, WardenError, MAX_SUSPENSION,
};
use warden_store::{Suspension, SuspensionStore};

/// Tunables for the scheduler.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Ceiling applied to requested suspension durations
    pub max_duration: Duration,
    /// Bound on a single external lift call
    pub lift_timeout: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_duration: MAX_SUSPENSION,
            lift_timeout: Duration::from_secs(10),
        }
    }
}

/// How a lift attempt concluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiftOutcome {
    /// Store reconciled and the platform restriction removed
    Lifted,
    /// Store reconciled but the platform call failed or timed out
    LiftedWithWarning,
    /// A concurrent path already deactivated the record; nothing done
    AlreadyLifted,
}

/// Result of a manual lift, echoing which record was acted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiftReceipt {
    /// The suspension that was (or had already been) lifted
    pub id: SuspensionId,
    /// What this call actually did
    pub outcome: LiftOutcome,
}

/// What startup recovery found and did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    /// Overdue records expired immediately
    pub expired: usize,
    /// Unexpired records whose timers were rebuilt
    pub rescheduled: usize,
    /// Records recovery could not process (logged and skipped)
    pub failed: usize,
}

struct Inner {
    store: SuspensionStore,
    timers: TimerRegistry,
    gateway: Arc<dyn RestrictionGateway>,
    notifier: Arc<dyn NotificationSink>,
    config: SchedulerConfig,
}

/// Coordinates the suspension store, the timer registry, and the injected
/// platform capabilities.
///
/// Cheap to clone; clones share state. The process lifecycle contract is:
/// call [`SuspensionService::recover_on_startup`] once after the store is
/// reachable and before accepting creations, and
/// [`SuspensionService::shutdown`] before exit.
#[derive(Clone)]
pub struct SuspensionService {
    inner: Arc<Inner>,
}

impl SuspensionService {
    pub fn new(
        store: SuspensionStore,
        gateway: Arc<dyn RestrictionGateway>,
        notifier: Arc<dyn NotificationSink>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                timers: TimerRegistry::new(),
                gateway,
                notifier,
                config,
            }),
        }
    }

    /// Persist a new suspension and schedule its expiry timer.
    ///
    /// The duration is clamped to the configured ceiling before the expiry
    /// is computed. A store failure bubbles to the caller: if the record
    /// could not be durably written, the command layer must not apply the
    /// platform restriction either.
    pub async fn create_suspension(
        &self,
        scope: ScopeId,
        subject: SubjectId,
        issuer: ActorId,
        duration: Duration,
        reason: impl Into<String>,
    ) -> Result<Suspension> {
        let capped = duration.min(self.inner.config.max_duration);
        let record = self
            .inner
            .store
            .create(scope, subject, issuer, capped, reason)
            .await?;

        self.schedule_expiry(&record);
        info!(
            id = %record.id,
            %scope,
            %subject,
            %issuer,
            expires_at = %record.expires_at,
            "suspension created"
        );
        Ok(record)
    }

    /// Manually lift a subject's active suspension before its expiry.
    ///
    /// Finds the newest active record for the pair, cancels its timer
    /// (best-effort), then runs the shared lift path. If the timer fired
    /// in between, the deactivate arbiter reports it and this call does
    /// nothing further. Errors with `NotFound` when the subject has no
    /// active suspension at all.
    pub async fn lift_suspension(
        &self,
        scope: ScopeId,
        subject: SubjectId,
        actor: ActorId,
        reason: impl Into<String>,
    ) -> Result<LiftReceipt> {
        let record = self
            .inner
            .store
            .find_active_by_subject(scope, subject)
            .await?
            .ok_or_else(|| {
                WardenError::not_found(format!(
                    "no active suspension for subject {subject} in scope {scope}"
                ))
            })?;

        self.inner.timers.cancel(record.id);

        let outcome = self
            .execute_lift(record.id, scope, subject, LiftCause::Manual, Some(reason.into()))
            .await?;
        info!(id = %record.id, %actor, ?outcome, "manual lift processed");

        Ok(LiftReceipt {
            id: record.id,
            outcome,
        })
    }

    /// Rebuild scheduler state from the store. Run once at process start.
    ///
    /// Overdue records are expired immediately, one at a time so external
    /// call concurrency stays bounded; a failure on one record is logged
    /// and the rest are still processed. Unexpired records get fresh
    /// timers.
    pub async fn recover_on_startup(&self) -> Result<RecoveryReport> {
        let now = Utc::now();
        let mut report = RecoveryReport::default();

        for record in self.inner.store.list_active_expired(now).await? {
            match self
                .execute_lift(record.id, record.scope, record.subject, LiftCause::Expired, None)
                .await
            {
                Ok(_) => report.expired += 1,
                Err(err) => {
                    report.failed += 1;
                    warn!(id = %record.id, %err, "failed to expire overdue suspension during recovery");
                }
            }
        }

        for record in self.inner.store.list_active_unexpired(now).await? {
            self.schedule_expiry(&record);
            report.rescheduled += 1;
        }

        info!(
            expired = report.expired,
            rescheduled = report.rescheduled,
            failed = report.failed,
            "suspension recovery complete"
        );
        Ok(report)
    }

    /// Active suspensions in a scope, soonest expiry first.
    pub async fn list_active(&self, scope: ScopeId) -> Result<Vec<Suspension>> {
        self.inner.store.list_active(scope).await
    }

    /// Cancel all pending timers. Call before process exit.
    pub fn shutdown(&self) {
        self.inner.timers.clear_all();
        info!("suspension scheduler shut down");
    }

    /// Whether an expiry timer is pending for `id`.
    pub fn has_pending_timer(&self, id: SuspensionId) -> bool {
        self.inner.timers.contains(id)
    }

    /// Number of pending expiry timers.
    pub fn pending_timers(&self) -> usize {
        self.inner.timers.len()
    }

    fn schedule_expiry(&self, record: &Suspension) {
        let service = self.clone();
        let id = record.id;
        let scope = record.scope;
        let subject = record.subject;
        self.inner.timers.schedule(
            id,
            record.expires_at,
            Box::pin(async move {
                if let Err(err) = service
                    .execute_lift(id, scope, subject, LiftCause::Expired, None)
                    .await
                {
                    warn!(%id, %err, "automatic expiry failed");
                }
            }),
        );
    }

    /// The one reconciliation path, shared by timer expiry, recovery
    /// catch-up, and manual override.
    ///
    /// Order matters: the store deactivate comes first and decides the
    /// race. Only the winner talks to the platform and notifies, and the
    /// store is already reconciled even if the platform call then fails.
    async fn execute_lift(
        &self,
        id: SuspensionId,
        scope: ScopeId,
        subject: SubjectId,
        cause: LiftCause,
        override_reason: Option<String>,
    ) -> Result<LiftOutcome> {
        let Some(record) = self.inner.store.deactivate(id).await? else {
            // A concurrent path won the record; normal, not an error
            debug!(%id, %cause, "suspension already lifted, skipping");
            return Ok(LiftOutcome::AlreadyLifted);
        };

        let lift = tokio::time::timeout(
            self.inner.config.lift_timeout,
            self.inner.gateway.lift_restriction(scope, subject),
        )
        .await;

        let outcome = match lift {
            Ok(Ok(())) => {
                info!(%id, %scope, %subject, %cause, "restriction lifted");
                LiftOutcome::Lifted
            }
            Ok(Err(err)) => {
                warn!(%id, %scope, %subject, %cause, %err, "restriction lifted in store, platform call failed");
                LiftOutcome::LiftedWithWarning
            }
            Err(_) => {
                warn!(%id, %scope, %subject, %cause, "restriction lifted in store, platform call timed out");
                LiftOutcome::LiftedWithWarning
            }
        };

        let notice = LiftNotice {
            id,
            scope,
            subject,
            cause,
            reason: override_reason.unwrap_or_else(|| record.reason.clone()),
            lifted_at: record.lifted_at.unwrap_or_else(Utc::now),
        };
        self.inner.notifier.notify(notice).await;

        Ok(outcome)
    }
}

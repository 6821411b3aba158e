//! Execution scheduling: per-transaction and per-group timers that run final
//! signature collation just before the execution instant, then submit.
//!
//! Arm/disarm are explicit registry transitions; the tokio timer mechanism is
//! only the delivery vehicle. Every timer callback rechecks current status at
//! fire time and never panics out of the scheduler: collation and fetch errors
//! are logged and simply leave the timer unarmed.

use crate::application::collator::{CollationOutcome, Collator};
use crate::domain::transaction::{StatusCode, TransactionGroup, TransactionRecord, TransactionStatus};
use crate::foundation::{now_millis, GroupId, QuorumError, Result, TransactionId};
use crate::infrastructure::config::SchedulerConfig;
use crate::infrastructure::remote::{StatusEvaluator, TransactionSubmitter};
use crate::infrastructure::storage::TransactionStore;
use log::{debug, info, warn};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum TimerKey {
    Collate(TransactionId),
    Execute(TransactionId),
    GroupCollate(GroupId),
    GroupExecute(GroupId),
}

/// When the collation and execution timers should fire, relative to now.
/// Pure function of the clock and the valid-start window, so the transition
/// logic is testable without real timers.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SchedulePlan {
    Armed { collate_in_ms: u64, execute_in_ms: u64 },
    /// The execution window has already closed; nothing may be armed.
    Expired,
}

pub fn plan_schedule(now_ms: u64, valid_start_ms: u64, config: &SchedulerConfig) -> SchedulePlan {
    let deadline_ms = valid_start_ms.saturating_add(config.execution_window_ms);
    if now_ms >= deadline_ms {
        return SchedulePlan::Expired;
    }
    let collate_at = valid_start_ms.saturating_sub(config.collate_lead_ms);
    let execute_at = valid_start_ms.saturating_add(config.execution_delay_ms);
    SchedulePlan::Armed {
        collate_in_ms: collate_at.saturating_sub(now_ms),
        execute_in_ms: execute_at.saturating_sub(now_ms),
    }
}

fn failure_code(outcome: &CollationOutcome) -> StatusCode {
    match outcome {
        CollationOutcome::Oversize => StatusCode::TransactionOversize,
        CollationOutcome::Unsatisfiable | CollationOutcome::Collated(_) => StatusCode::ThresholdUnsatisfiable,
    }
}

struct SchedulerInner {
    store: Arc<dyn TransactionStore>,
    collator: Arc<Collator>,
    submitter: Arc<dyn TransactionSubmitter>,
    evaluator: Arc<dyn StatusEvaluator>,
    config: SchedulerConfig,
    timers: Mutex<HashMap<TimerKey, JoinHandle<()>>>,
    scheduled_groups: Mutex<HashSet<GroupId>>,
}

#[derive(Clone)]
pub struct ExecutionScheduler {
    inner: Arc<SchedulerInner>,
}

impl ExecutionScheduler {
    pub fn new(
        store: Arc<dyn TransactionStore>,
        collator: Arc<Collator>,
        submitter: Arc<dyn TransactionSubmitter>,
        evaluator: Arc<dyn StatusEvaluator>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                store,
                collator,
                submitter,
                evaluator,
                config,
                timers: Mutex::new(HashMap::new()),
                scheduled_groups: Mutex::new(HashSet::new()),
            }),
        }
    }

    /// Consumes the external status evaluator's transition map, persisting each
    /// transition and routing newly executable transactions into scheduling.
    /// One failing transition never abandons the rest of the batch.
    pub async fn apply_status_updates(&self, updates: HashMap<TransactionId, TransactionStatus>) {
        for (id, status) in updates {
            if let Err(err) = self.inner.store.update_status(id, status) {
                warn!("failed to apply status transition tx_id={} status={} error={}", id, status, err);
                continue;
            }
            if status == TransactionStatus::WaitingForExecution {
                let routed = match self.inner.store.get_transaction(id) {
                    Ok(record) => match record.and_then(|r| r.group_id) {
                        Some(group_id) => self.collate_group_and_execute(group_id).await,
                        None => self.collate_and_execute(id).await,
                    },
                    Err(err) => Err(err),
                };
                if let Err(err) = routed {
                    warn!("failed to schedule executable transaction tx_id={} error={}", id, err);
                }
            }
        }
    }

    /// Schedules a single transaction that entered `WaitingForExecution`.
    /// Idempotent: a transaction with a registered timer is left alone.
    pub async fn collate_and_execute(&self, id: TransactionId) -> Result<()> {
        let record = self.inner.store.get_transaction(id)?.ok_or(QuorumError::TransactionNotFound(id.value()))?;
        if record.is_manual {
            debug!("manual transaction not auto-scheduled tx_id={}", id);
            return Ok(());
        }
        if record.status != TransactionStatus::WaitingForExecution {
            debug!("transaction not executable tx_id={} status={}", id, record.status);
            return Ok(());
        }

        match plan_schedule(now_millis(), record.valid_start_ms, &self.inner.config) {
            SchedulePlan::Expired => {
                info!("execution window already closed tx_id={} valid_start_ms={}", id, record.valid_start_ms);
                self.route_expired(&[id]).await;
                Ok(())
            }
            SchedulePlan::Armed { collate_in_ms, execute_in_ms } => {
                self.arm(TimerKey::Collate(id), Duration::from_millis(collate_in_ms), {
                    let scheduler = self.clone();
                    async move { scheduler.run_transaction_collation(id, execute_in_ms.saturating_sub(collate_in_ms)).await }
                });
                Ok(())
            }
        }
    }

    /// Schedules a whole group. A group is scheduled at most once per outcome:
    /// concurrent transition observations collapse into one arming, and the
    /// entry is cleared again when the group reaches a terminal outcome so a
    /// failed group can be rescheduled after its members are repaired.
    pub async fn collate_group_and_execute(&self, group_id: GroupId) -> Result<()> {
        let group = self.inner.store.get_group(group_id)?.ok_or(QuorumError::GroupNotFound(group_id.value()))?;

        let mut members: Vec<TransactionRecord> = Vec::with_capacity(group.members.len());
        for member_id in &group.members {
            let record = self
                .inner
                .store
                .get_transaction(*member_id)?
                .ok_or(QuorumError::TransactionNotFound(member_id.value()))?;
            members.push(record);
        }

        if members.iter().any(|m| m.is_manual) {
            debug!("group with manual member not auto-scheduled group_id={}", group_id);
            return Ok(());
        }

        if group.sequential {
            // Sequential groups arm only once every member is individually ready.
            let not_ready = members.iter().filter(|m| m.status != TransactionStatus::WaitingForExecution).count();
            if not_ready > 0 {
                debug!("sequential group not fully ready group_id={} waiting_members={}", group_id, not_ready);
                return Ok(());
            }
        }

        {
            let mut scheduled = self.inner.scheduled_groups.lock().unwrap_or_else(|e| e.into_inner());
            if !scheduled.insert(group_id) {
                debug!("group already scheduled group_id={}", group_id);
                return Ok(());
            }
        }

        // The group executes after every member's valid start, and must fit
        // inside the tightest member window.
        let latest_valid_start = members.iter().map(|m| m.valid_start_ms).max().unwrap_or(0);
        let earliest_deadline = members
            .iter()
            .map(|m| m.valid_start_ms.saturating_add(self.inner.config.execution_window_ms))
            .min()
            .unwrap_or(0);
        let now = now_millis();
        if now >= earliest_deadline || latest_valid_start.saturating_add(self.inner.config.execution_delay_ms) >= earliest_deadline {
            info!("group window already closed group_id={} members={}", group_id, members.len());
            let ids: Vec<TransactionId> = members.iter().map(|m| m.id).collect();
            self.route_expired(&ids).await;
            self.unschedule_group(group_id);
            return Ok(());
        }

        let collate_in_ms = latest_valid_start.saturating_sub(self.inner.config.collate_lead_ms).saturating_sub(now);
        let execute_in_ms = latest_valid_start.saturating_add(self.inner.config.execution_delay_ms).saturating_sub(now);
        self.arm(TimerKey::GroupCollate(group_id), Duration::from_millis(collate_in_ms), {
            let scheduler = self.clone();
            async move { scheduler.run_group_collation(group_id, execute_in_ms.saturating_sub(collate_in_ms)).await }
        });
        Ok(())
    }

    /// Cancels a registered timer (e.g. status externally changed before it
    /// fired). The callback rechecks status at fire time regardless, so a lost
    /// race here is benign.
    pub fn disarm(&self, key: TimerKey) {
        let handle = self.inner.timers.lock().unwrap_or_else(|e| e.into_inner()).remove(&key);
        if let Some(handle) = handle {
            handle.abort();
            debug!("timer disarmed key={:?}", key);
        }
    }

    pub fn has_timer(&self, key: TimerKey) -> bool {
        self.inner.timers.lock().unwrap_or_else(|e| e.into_inner()).contains_key(&key)
    }

    /// Registers a timer unless one already exists for `key`. The accepted
    /// check-then-set race is benign: duplicate registration is a no-op, not a
    /// duplicate execution.
    fn arm<F>(&self, key: TimerKey, delay: Duration, callback: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let mut timers = self.inner.timers.lock().unwrap_or_else(|e| e.into_inner());
        if timers.contains_key(&key) {
            debug!("timer already registered key={:?}", key);
            return;
        }
        let scheduler = self.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            callback.await;
            scheduler.inner.timers.lock().unwrap_or_else(|e| e.into_inner()).remove(&key);
        });
        timers.insert(key, handle);
        debug!("timer armed key={:?} delay_ms={}", key, delay.as_millis());
    }

    async fn run_transaction_collation(&self, id: TransactionId, execute_after_ms: u64) {
        let record = match self.inner.store.get_transaction(id) {
            Ok(Some(record)) => record,
            Ok(None) => {
                warn!("transaction disappeared before collation tx_id={}", id);
                return;
            }
            Err(err) => {
                warn!("collation load failed tx_id={} error={}", id, err);
                return;
            }
        };
        // Status may have changed externally while the timer was pending.
        if record.status != TransactionStatus::WaitingForExecution {
            debug!("collation skipped, status changed tx_id={} status={}", id, record.status);
            return;
        }

        match self.inner.collator.collate(&record).await {
            Ok(CollationOutcome::Collated(reduced)) => {
                if let Err(err) = self.inner.store.update_body_bytes(id, reduced) {
                    warn!("failed to persist collated body tx_id={} error={}", id, err);
                    return;
                }
                self.arm(TimerKey::Execute(id), Duration::from_millis(execute_after_ms), {
                    let scheduler = self.clone();
                    async move { scheduler.run_transaction_execution(id).await }
                });
            }
            Ok(outcome) => {
                let code = failure_code(&outcome);
                info!("collation failed terminally tx_id={} code={}", id, code);
                if let Err(err) = self.inner.store.mark_failed(id, code, now_millis()) {
                    warn!("failed to mark transaction failed tx_id={} error={}", id, err);
                }
            }
            Err(err) => {
                // Transient resolution/storage trouble: do not execute, do not
                // re-arm; the next observed transition may retry.
                warn!("collation errored tx_id={} error={}", id, err);
            }
        }
    }

    async fn run_transaction_execution(&self, id: TransactionId) {
        let record = match self.inner.store.get_transaction(id) {
            Ok(Some(record)) => record,
            Ok(None) | Err(_) => {
                warn!("transaction unavailable at execution time tx_id={}", id);
                return;
            }
        };
        if record.status != TransactionStatus::WaitingForExecution {
            debug!("execution skipped, status changed tx_id={} status={}", id, record.status);
            return;
        }

        match self.inner.submitter.submit(id, &record.body_bytes).await {
            Ok(()) => {
                info!("transaction executed tx_id={}", id);
                if let Err(err) = self.inner.store.mark_executed(id, now_millis()) {
                    warn!("failed to mark transaction executed tx_id={} error={}", id, err);
                }
            }
            Err(err) => {
                warn!("submission failed tx_id={} error={}", id, err);
                if let Err(err) = self.inner.store.mark_failed(id, StatusCode::SubmitFailed, now_millis()) {
                    warn!("failed to mark transaction failed tx_id={} error={}", id, err);
                }
            }
        }
    }

    async fn run_group_collation(&self, group_id: GroupId, execute_after_ms: u64) {
        let group = match self.inner.store.get_group(group_id) {
            Ok(Some(group)) => group,
            Ok(None) | Err(_) => {
                warn!("group unavailable at collation time group_id={}", group_id);
                self.unschedule_group(group_id);
                return;
            }
        };

        let mut collated: Vec<(TransactionId, Vec<u8>)> = Vec::with_capacity(group.members.len());
        let mut group_failure: Option<StatusCode> = None;
        for member_id in &group.members {
            let record = match self.inner.store.get_transaction(*member_id) {
                Ok(Some(record)) => record,
                Ok(None) | Err(_) => {
                    warn!("group member unavailable group_id={} tx_id={}", group_id, member_id);
                    if group.atomic {
                        group_failure = Some(StatusCode::ThresholdUnsatisfiable);
                        break;
                    }
                    continue;
                }
            };
            // Members an external actor already moved on are skipped, never
            // re-failed.
            if record.status != TransactionStatus::WaitingForExecution {
                debug!("group member no longer executable group_id={} tx_id={} status={}", group_id, member_id, record.status);
                continue;
            }
            match self.inner.collator.collate(&record).await {
                Ok(CollationOutcome::Collated(reduced)) => collated.push((*member_id, reduced)),
                Ok(outcome) => {
                    let code = failure_code(&outcome);
                    info!("group member collation failed group_id={} tx_id={} code={}", group_id, member_id, code);
                    if group.atomic {
                        group_failure = Some(code);
                        break;
                    }
                    // Non-atomic groups isolate the failure to the member.
                    if let Err(err) = self.inner.store.mark_failed(*member_id, code, now_millis()) {
                        warn!("failed to mark group member failed group_id={} tx_id={} error={}", group_id, member_id, err);
                    }
                }
                Err(err) => {
                    // Transient: neither execute this member nor fail it.
                    warn!("group member collation errored group_id={} tx_id={} error={}", group_id, member_id, err);
                    if group.atomic {
                        group_failure = Some(StatusCode::ThresholdUnsatisfiable);
                        break;
                    }
                }
            }
        }

        if let Some(code) = group_failure {
            // All-or-nothing: one member failing fails every still-pending
            // member and nothing proceeds.
            self.fail_waiting_members(&group, code);
            self.unschedule_group(group_id);
            return;
        }

        if collated.is_empty() {
            debug!("no group member left to execute group_id={}", group_id);
            self.unschedule_group(group_id);
            return;
        }

        for (member_id, reduced) in collated {
            if let Err(err) = self.inner.store.update_body_bytes(member_id, reduced) {
                warn!("failed to persist collated member body group_id={} tx_id={} error={}", group_id, member_id, err);
                self.unschedule_group(group_id);
                return;
            }
        }

        self.arm(TimerKey::GroupExecute(group_id), Duration::from_millis(execute_after_ms), {
            let scheduler = self.clone();
            async move { scheduler.run_group_execution(group_id).await }
        });
    }

    fn fail_waiting_members(&self, group: &TransactionGroup, code: StatusCode) {
        let now = now_millis();
        for member_id in &group.members {
            let waiting = matches!(
                self.inner.store.get_transaction(*member_id),
                Ok(Some(record)) if record.status == TransactionStatus::WaitingForExecution
            );
            if !waiting {
                continue;
            }
            if let Err(err) = self.inner.store.mark_failed(*member_id, code, now) {
                warn!("failed to mark group member failed group_id={} tx_id={} error={}", group.id, member_id, err);
            }
        }
    }

    fn unschedule_group(&self, group_id: GroupId) {
        self.inner.scheduled_groups.lock().unwrap_or_else(|e| e.into_inner()).remove(&group_id);
    }

    async fn run_group_execution(&self, group_id: GroupId) {
        let group = match self.inner.store.get_group(group_id) {
            Ok(Some(group)) => group,
            Ok(None) | Err(_) => {
                warn!("group unavailable at execution time group_id={}", group_id);
                self.unschedule_group(group_id);
                return;
            }
        };

        // Members run one at a time in order; for a non-sequential group the
        // order is still deterministic but failures do not stop later members.
        for member_id in &group.members {
            self.run_transaction_execution(*member_id).await;
            if group.sequential {
                let still_ok = matches!(
                    self.inner.store.get_transaction(*member_id),
                    Ok(Some(record)) if record.status == TransactionStatus::Executed
                );
                if !still_ok {
                    warn!("sequential group halted group_id={} tx_id={}", group_id, member_id);
                    break;
                }
            }
        }

        // Terminal outcome reached; clear the entry so a repaired group can be
        // scheduled again.
        self.unschedule_group(group_id);
    }

    /// Expired windows are routed back through the external status evaluator;
    /// this subsystem never invents the terminal state itself.
    async fn route_expired(&self, ids: &[TransactionId]) {
        match self.inner.evaluator.evaluate(ids).await {
            Ok(transitions) => {
                for (id, status) in transitions {
                    if let Err(err) = self.inner.store.update_status(id, status) {
                        warn!("failed to apply evaluator transition tx_id={} status={} error={}", id, status, err);
                    }
                }
            }
            Err(err) => warn!("status evaluation failed ids={} error={}", ids.len(), err),
        }
    }
}

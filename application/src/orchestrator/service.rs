use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde_json::json;
use time::OffsetDateTime;

use domain::batch::{Assignment, RequestId};
use domain::change::{Change, ChangeType};
use domain::coords::TileCoord;
use domain::guard_config::GuardConfig;
use domain::session::{Session, SessionId, SessionStatus};
use domain::worker::WorkerId;

use crate::batch_tracker::service::BatchTrackerService;
use crate::change_filter;
use crate::dispatch::service::DispatchPipeline;
use crate::error::{AppError, AppResult};
use crate::guard_config::service::GuardConfigService;
use crate::infrastructure_config::DispatchConfig;
use crate::lockout::service::LockoutService;
use crate::pattern::selector;
use crate::planner::service::PlannerService;
use crate::ports::incoming::session::{RoundOutcome, SessionUseCase};
use crate::ports::outgoing::registry::DynRegistryPort;
use crate::ports::outgoing::store::DynProjectSessionStorePort;
use crate::preview::service::PreviewProtocol;

/// One live session's repair loop, plus the non-looping `one_batch` sibling
/// used by interactive UIs (C7). The loop itself is cooperative and
/// single-threaded per session; multiple sessions run concurrently as
/// independent spawned tasks gated by their own running flag.
pub struct OrchestratorService {
    store: DynProjectSessionStorePort,
    registry: DynRegistryPort,
    lockout: Arc<LockoutService>,
    batch_tracker: Arc<BatchTrackerService>,
    planner: PlannerService,
    preview_protocol: Arc<PreviewProtocol>,
    dispatch: Arc<DispatchPipeline>,
    guard_config: Arc<GuardConfigService>,
    config: DispatchConfig,
    running: DashMap<SessionId, Arc<AtomicBool>>,
}

impl OrchestratorService {
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        store: DynProjectSessionStorePort,
        registry: DynRegistryPort,
        lockout: Arc<LockoutService>,
        batch_tracker: Arc<BatchTrackerService>,
        preview_protocol: Arc<PreviewProtocol>,
        dispatch: Arc<DispatchPipeline>,
        guard_config: Arc<GuardConfigService>,
        config: DispatchConfig,
    ) -> Self {
        Self {
            store,
            registry,
            lockout,
            batch_tracker,
            planner: PlannerService::new(),
            preview_protocol,
            dispatch,
            guard_config,
            config,
            running: DashMap::new(),
        }
    }

    async fn require_session(&self, session_id: SessionId) -> AppResult<Session> {
        self.store
            .get_session(session_id)
            .await?
            .ok_or_else(|| AppError::SessionNotFound { id: session_id.to_string() })
    }

    fn session_worker_set(&self, session: &Session) -> HashSet<WorkerId> {
        session.slave_ids.iter().cloned().collect()
    }

    /// Background loop spawned by `start`. Checks the running flag at the
    /// top of every iteration and again before the inter-round sleep, so a
    /// `stop` takes effect at the next checkpoint without aborting in-flight
    /// sends.
    async fn run_loop(&self, session_id: SessionId, flag: Arc<AtomicBool>) {
        let round_deadline = Duration::from_secs(self.config.round_retry_deadline_secs);
        while flag.load(Ordering::Relaxed) {
            if let Err(err) = self.run_iteration(session_id, round_deadline).await {
                tracing::error!(%session_id, error = %err, "orchestrator iteration failed; backing off");
                tokio::time::sleep(Duration::from_secs(2)).await;
                continue;
            }
            if !flag.load(Ordering::Relaxed) {
                break;
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
    }

    /// One full pass of the main loop body (§4.7 steps 1-9). Any early exit
    /// (no connected workers, no changes, no credits, insufficient credits
    /// to start a round, nothing left after lockout filtering) sleeps the
    /// documented backoff and returns an empty outcome rather than erroring.
    async fn run_iteration(&self, session_id: SessionId, retry_deadline: Duration) -> AppResult<RoundOutcome> {
        let session = self.require_session(session_id).await?;
        let connected: HashSet<WorkerId> = self.registry.connected_ids().await.into_iter().collect();
        let valid_slaves: Vec<WorkerId> =
            session.slave_ids.iter().filter(|id| connected.contains(*id)).cloned().collect();
        if valid_slaves.is_empty() {
            tokio::time::sleep(Duration::from_secs(3)).await;
            return Ok(empty_outcome());
        }

        let guard_config = self.guard_config.snapshot();
        let changes = self.collect_changes(&guard_config).await?;
        let credits = self.collect_credits(&valid_slaves).await;
        let total: i64 = credits.values().sum();

        if changes.is_empty() {
            tokio::time::sleep(Duration::from_secs(5)).await;
            return Ok(empty_outcome());
        }
        if total <= 0 {
            tokio::time::sleep(Duration::from_secs(30)).await;
            return Ok(empty_outcome());
        }

        let pixels_per_batch = u64::from(guard_config.pixels_per_batch());
        let total_u64 = u64::try_from(total).unwrap_or(0);
        let spend_all = guard_config.spend_all_pixels_on_start();
        if !spend_all && total_u64 < pixels_per_batch {
            tokio::time::sleep(Duration::from_secs(10)).await;
            return Ok(empty_outcome());
        }
        let desired = if spend_all { total_u64 } else { total_u64.min(pixels_per_batch) };
        let desired = u32::try_from(desired).unwrap_or(u32::MAX);

        let credit_vec: Vec<(WorkerId, i64)> = credits.iter().map(|(id, c)| (id.clone(), *c)).collect();
        let plan = self.planner.plan(guard_config.charge_strategy(), &credit_vec, desired);

        let now = OffsetDateTime::now_utc().unix_timestamp();
        let eligible: Vec<Change> =
            changes.into_iter().filter(|change| !self.lockout.is_locked(change.coord, now)).collect();
        let plan_total: u32 = plan.values().sum();
        let pick = eligible.len().min(usize::try_from(plan_total).unwrap_or(usize::MAX));
        if pick == 0 {
            tokio::time::sleep(Duration::from_secs(5)).await;
            return Ok(empty_outcome());
        }

        let mut rng = rand::rng();
        let selected = selector::select(guard_config.protection_pattern(), &eligible, pick, &mut rng);
        let queues = build_queues(&selected, &plan, &valid_slaves);

        let request_id = RequestId::new();
        self.batch_tracker.create(request_id).await;
        self.dispatch_round(&queues, request_id).await;
        self.run_retry_loop(&valid_slaves, &credits, guard_config.max_retries(), request_id, retry_deadline)
            .await;

        Ok(RoundOutcome {
            request_id,
            plan: plan.into_iter().collect(),
            dispatched: u32::try_from(pick).unwrap_or(u32::MAX),
        })
    }

    async fn collect_changes(&self, guard_config: &GuardConfig) -> AppResult<Vec<Change>> {
        let Some(favorite_id) = self.registry.favorite_id().await else {
            return Ok(Vec::new());
        };
        self.preview_protocol.refresh(&favorite_id).await?;
        let raw = self.preview_protocol.read(&favorite_id).await.map(|preview| preview.changes).unwrap_or_default();
        Ok(change_filter::filter_and_sort(&raw, guard_config))
    }

    async fn collect_credits(&self, valid_slaves: &[WorkerId]) -> HashMap<WorkerId, i64> {
        let mut credits = HashMap::with_capacity(valid_slaves.len());
        for slave_id in valid_slaves {
            let remaining =
                self.registry.get_worker(slave_id).await.map_or(0, |worker| worker.remaining_charges());
            credits.insert(slave_id.clone(), remaining);
        }
        credits
    }

    async fn dispatch_round(&self, queues: &HashMap<WorkerId, Vec<Change>>, request_id: RequestId) {
        let sends = queues.iter().map(|(slave_id, items)| async move {
            if let Err(err) = self.dispatch.dispatch(slave_id, items, request_id).await {
                tracing::warn!(%slave_id, error = %err, "dispatch failed");
            }
        });
        futures::future::join_all(sends).await;
    }

    /// Polls every `retry_poll_interval_ms` until the request's pending
    /// count drops to zero or `retry_deadline` elapses, resending each
    /// failed assignment to a substitute worker.
    async fn run_retry_loop(
        &self,
        valid_slaves: &[WorkerId],
        credits: &HashMap<WorkerId, i64>,
        max_retries: u32,
        request_id: RequestId,
        retry_deadline: Duration,
    ) {
        let deadline = Instant::now() + retry_deadline;
        loop {
            tokio::time::sleep(Duration::from_millis(self.config.retry_poll_interval_ms)).await;
            if self.batch_tracker.get_pending(request_id).await == 0 {
                break;
            }
            let failed = self.batch_tracker.failed_assignments(request_id).await;
            for assignment in failed {
                self.retry_assignment(valid_slaves, credits, max_retries, request_id, assignment).await;
            }
            if Instant::now() >= deadline {
                break;
            }
        }
    }

    async fn retry_assignment(
        &self,
        valid_slaves: &[WorkerId],
        credits: &HashMap<WorkerId, i64>,
        max_retries: u32,
        request_id: RequestId,
        assignment: Assignment,
    ) {
        let Some(candidate) = choose_retry_candidate(valid_slaves, credits, &assignment.slave_id) else {
            return;
        };
        let Some(attempts) = self
            .batch_tracker
            .inc_attempts(request_id, &assignment.slave_id, &assignment.batch_key)
            .await
        else {
            return;
        };

        if attempts <= max_retries {
            let changes: Vec<Change> = assignment
                .coords
                .iter()
                .zip(assignment.colors.iter())
                .map(|(coord, color)| Change::new(*coord, ChangeType::Missing, Some(*color)))
                .collect();
            let tile = TileCoord::new(assignment.tile_x, assignment.tile_y);
            if let Err(err) = self.dispatch.resend_tile(&candidate, tile, &changes, request_id).await {
                tracing::warn!(%candidate, error = %err, "resend failed");
            }
        } else {
            let removed = self.batch_tracker.cleanup_abandoned(request_id, max_retries).await;
            tracing::warn!(slave_id = %assignment.slave_id, removed, "abandoning assignment after exhausting retries");
        }
    }
}

#[async_trait::async_trait]
impl SessionUseCase for Arc<OrchestratorService> {
    async fn start(&self, session_id: SessionId) -> AppResult<()> {
        let session = self.require_session(session_id).await?;
        let project = self
            .store
            .get_project(session.project_id)
            .await?
            .ok_or_else(|| AppError::ProjectNotFound { id: session.project_id.0.to_string() })?;

        let connected: HashSet<WorkerId> = self.registry.connected_ids().await.into_iter().collect();
        let valid: HashSet<WorkerId> =
            session.slave_ids.iter().filter(|id| connected.contains(*id)).cloned().collect();

        self.registry
            .broadcast_to_slaves(json!({ "type": "setMode", "mode": project.mode }), Some(valid.clone()))
            .await?;
        self.registry
            .broadcast_to_slaves(json!({ "type": "loadProject", "project": project }), Some(valid))
            .await?;

        self.store.set_session_status(session_id, SessionStatus::Running, OffsetDateTime::now_utc()).await?;

        let flag = Arc::new(AtomicBool::new(true));
        self.running.insert(session_id, Arc::clone(&flag));

        let worker = Arc::clone(self);
        tokio::spawn(async move { worker.run_loop(session_id, flag).await });
        Ok(())
    }

    async fn pause(&self, session_id: SessionId) -> AppResult<()> {
        let session = self.require_session(session_id).await?;
        self.store.set_session_status(session_id, SessionStatus::Paused, OffsetDateTime::now_utc()).await?;
        let ids = self.session_worker_set(&session);
        self.registry.broadcast_to_slaves(json!({ "type": "control", "action": "pause" }), Some(ids)).await?;
        if let Some(flag) = self.running.get(&session_id) {
            flag.store(false, Ordering::Relaxed);
        }
        Ok(())
    }

    async fn stop(&self, session_id: SessionId) -> AppResult<()> {
        let session = self.require_session(session_id).await?;
        self.store.set_session_status(session_id, SessionStatus::Stopped, OffsetDateTime::now_utc()).await?;
        let ids = self.session_worker_set(&session);
        self.registry.broadcast_to_slaves(json!({ "type": "control", "action": "stop" }), Some(ids)).await?;
        if let Some((_, flag)) = self.running.remove(&session_id) {
            flag.store(false, Ordering::Relaxed);
        }
        Ok(())
    }

    async fn one_batch(&self, session_id: SessionId) -> AppResult<RoundOutcome> {
        let deadline = Duration::from_secs(self.config.one_batch_retry_deadline_secs);
        self.run_iteration(session_id, deadline).await
    }
}

fn empty_outcome() -> RoundOutcome {
    RoundOutcome { request_id: RequestId::new(), plan: Vec::new(), dispatched: 0 }
}

/// Round-robins `selected` across workers that still have quota left in
/// `plan`, preserving the pattern's relative order within each worker's
/// queue, in `valid_slaves` iteration order.
fn build_queues(
    selected: &[Change],
    plan: &HashMap<WorkerId, u32>,
    valid_slaves: &[WorkerId],
) -> HashMap<WorkerId, Vec<Change>> {
    let mut wheel: VecDeque<(WorkerId, u32)> = valid_slaves
        .iter()
        .filter_map(|slave_id| plan.get(slave_id).copied().filter(|quota| *quota > 0).map(|quota| (slave_id.clone(), quota)))
        .collect();

    let mut queues: HashMap<WorkerId, Vec<Change>> = HashMap::new();
    for change in selected {
        let Some((slave_id, quota)) = wheel.pop_front() else {
            break;
        };
        queues.entry(slave_id.clone()).or_default().push(*change);
        if quota > 1 {
            wheel.push_back((slave_id, quota - 1));
        }
    }
    queues
}

/// Prefers a different worker with spare credit, falls back to any other
/// valid worker, and finally to the failed assignment's own worker.
fn choose_retry_candidate(
    valid_slaves: &[WorkerId],
    credits: &HashMap<WorkerId, i64>,
    exclude: &WorkerId,
) -> Option<WorkerId> {
    valid_slaves
        .iter()
        .find(|id| *id != exclude && credits.get(*id).copied().unwrap_or(0) > 0)
        .or_else(|| valid_slaves.iter().find(|id| *id != exclude))
        .or_else(|| valid_slaves.first())
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::color::ColorId;
    use domain::coords::Coord;

    fn change(x: i32, color: i64) -> Change {
        Change::new(Coord::new(x, 0), ChangeType::Missing, Some(ColorId::new(color)))
    }

    #[test]
    fn build_queues_respects_quota_and_order() {
        let a = WorkerId::new("a");
        let b = WorkerId::new("b");
        let valid_slaves = vec![a.clone(), b.clone()];
        let plan: HashMap<WorkerId, u32> = [(a.clone(), 2), (b.clone(), 1)].into_iter().collect();
        let selected = vec![change(0, 1), change(1, 2), change(2, 3)];

        let queues = build_queues(&selected, &plan, &valid_slaves);
        assert_eq!(queues.get(&a).map(Vec::len), Some(2));
        assert_eq!(queues.get(&b).map(Vec::len), Some(1));
    }

    #[test]
    fn build_queues_stops_when_selected_exceeds_quota() {
        let a = WorkerId::new("a");
        let valid_slaves = vec![a.clone()];
        let plan: HashMap<WorkerId, u32> = [(a.clone(), 1)].into_iter().collect();
        let selected = vec![change(0, 1), change(1, 2)];

        let queues = build_queues(&selected, &plan, &valid_slaves);
        assert_eq!(queues.get(&a).map(Vec::len), Some(1));
    }

    #[test]
    fn retry_candidate_prefers_other_worker_with_credit() {
        let a = WorkerId::new("a");
        let b = WorkerId::new("b");
        let valid_slaves = vec![a.clone(), b.clone()];
        let credits: HashMap<WorkerId, i64> = [(a.clone(), 0), (b.clone(), 5)].into_iter().collect();

        let candidate = choose_retry_candidate(&valid_slaves, &credits, &a);
        assert_eq!(candidate, Some(b));
    }

    #[test]
    fn retry_candidate_falls_back_to_self_when_alone() {
        let a = WorkerId::new("a");
        let valid_slaves = vec![a.clone()];
        let credits: HashMap<WorkerId, i64> = [(a.clone(), 0)].into_iter().collect();

        let candidate = choose_retry_candidate(&valid_slaves, &credits, &a);
        assert_eq!(candidate, Some(a));
    }
}

use std::collections::HashMap;

use tokio::sync::Mutex;

use domain::batch::{Assignment, AssignmentStatus, BatchKey, RequestId};
use domain::color::ColorId;
use domain::coords::Coord;
use domain::worker::WorkerId;

struct RequestBucket {
    assignments: HashMap<(WorkerId, BatchKey), Assignment>,
    pending: usize,
}

impl RequestBucket {
    fn new() -> Self {
        Self {
            assignments: HashMap::new(),
            pending: 0,
        }
    }

    fn recompute_pending(&mut self) {
        self.pending = self
            .assignments
            .values()
            .filter(|assignment| assignment.status == AssignmentStatus::Pending)
            .count();
    }
}

/// Per-request map of dispatched sub-batches with attempt counters and
/// pending counts (C2). All operations are serialised under a single lock;
/// there is no lock hierarchy above this component.
pub struct BatchTrackerService {
    requests: Mutex<HashMap<RequestId, RequestBucket>>,
}

impl BatchTrackerService {
    #[must_use]
    pub fn new() -> Self {
        Self {
            requests: Mutex::new(HashMap::new()),
        }
    }

    pub async fn create(&self, request_id: RequestId) {
        let mut requests = self.requests.lock().await;
        requests.insert(request_id, RequestBucket::new());
    }

    pub async fn assign(
        &self,
        request_id: RequestId,
        slave_id: WorkerId,
        tile_x: i32,
        tile_y: i32,
        coords: Vec<Coord>,
        colors: Vec<ColorId>,
        attempt: u32,
    ) {
        let mut requests = self.requests.lock().await;
        let bucket = requests.entry(request_id).or_insert_with(RequestBucket::new);
        let assignment = Assignment::new(slave_id.clone(), tile_x, tile_y, coords, colors, attempt);
        let key = (slave_id, assignment.batch_key.clone());
        bucket.assignments.insert(key, assignment);
        bucket.recompute_pending();
    }

    /// Recomputes the batch key from the payload shape and flips the
    /// matching assignment to `ok` or `failed`.
    pub async fn mark(
        &self,
        request_id: RequestId,
        slave_id: &WorkerId,
        tile_x: i32,
        tile_y: i32,
        coords: &[Coord],
        ok: bool,
    ) {
        let batch_key = BatchKey::from_payload(tile_x, tile_y, coords);
        let mut requests = self.requests.lock().await;
        let Some(bucket) = requests.get_mut(&request_id) else {
            return;
        };
        if let Some(assignment) = bucket.assignments.get_mut(&(slave_id.clone(), batch_key)) {
            assignment.status = if ok {
                AssignmentStatus::Ok
            } else {
                AssignmentStatus::Failed
            };
        }
        bucket.recompute_pending();
    }

    #[must_use]
    pub async fn failed_assignments(&self, request_id: RequestId) -> Vec<Assignment> {
        let requests = self.requests.lock().await;
        requests
            .get(&request_id)
            .map(|bucket| {
                bucket
                    .assignments
                    .values()
                    .filter(|assignment| assignment.status == AssignmentStatus::Failed)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Increments `attempts` for the given assignment, resets its status to
    /// `pending`, and returns the new attempt count. Returns `None` if no
    /// such assignment exists.
    pub async fn inc_attempts(
        &self,
        request_id: RequestId,
        slave_id: &WorkerId,
        batch_key: &BatchKey,
    ) -> Option<u32> {
        let mut requests = self.requests.lock().await;
        let bucket = requests.get_mut(&request_id)?;
        let assignment = bucket
            .assignments
            .get_mut(&(slave_id.clone(), batch_key.clone()))?;
        assignment.attempts += 1;
        assignment.status = AssignmentStatus::Pending;
        let attempts = assignment.attempts;
        bucket.recompute_pending();
        Some(attempts)
    }

    #[must_use]
    pub async fn get_pending(&self, request_id: RequestId) -> usize {
        let requests = self.requests.lock().await;
        requests.get(&request_id).map_or(0, |bucket| bucket.pending)
    }

    /// Deletes assignments whose status is `failed` and whose attempts
    /// exceed `max_retries`. Returns the count removed.
    pub async fn cleanup_abandoned(&self, request_id: RequestId, max_retries: u32) -> usize {
        let mut requests = self.requests.lock().await;
        let Some(bucket) = requests.get_mut(&request_id) else {
            return 0;
        };
        let before = bucket.assignments.len();
        bucket.assignments.retain(|_, assignment| {
            !(assignment.status == AssignmentStatus::Failed && assignment.attempts > max_retries)
        });
        bucket.recompute_pending();
        before - bucket.assignments.len()
    }
}

impl Default for BatchTrackerService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coord(x: i32, y: i32) -> Coord {
        Coord::new(x, y)
    }

    #[tokio::test]
    async fn assign_and_mark_resolves_pending() {
        let tracker = BatchTrackerService::new();
        let request_id = RequestId::new();
        tracker.create(request_id).await;

        let worker = WorkerId::new("w1");
        tracker
            .assign(
                request_id,
                worker.clone(),
                1,
                2,
                vec![coord(1000, 2000)],
                vec![ColorId::new(3)],
                0,
            )
            .await;
        assert_eq!(tracker.get_pending(request_id).await, 1);

        tracker
            .mark(request_id, &worker, 1, 2, &[coord(1000, 2000)], true)
            .await;
        assert_eq!(tracker.get_pending(request_id).await, 0);
        assert!(tracker.failed_assignments(request_id).await.is_empty());
    }

    #[tokio::test]
    async fn retry_then_abandon() {
        let tracker = BatchTrackerService::new();
        let request_id = RequestId::new();
        tracker.create(request_id).await;

        let worker = WorkerId::new("w1");
        let coords = vec![coord(5, 5)];
        tracker
            .assign(request_id, worker.clone(), 0, 0, coords.clone(), vec![], 0)
            .await;
        tracker
            .mark(request_id, &worker, 0, 0, &coords, false)
            .await;

        let failed = tracker.failed_assignments(request_id).await;
        assert_eq!(failed.len(), 1);
        let first_failed = failed.first().expect("one failed assignment");

        let attempts = tracker
            .inc_attempts(request_id, &worker, &first_failed.batch_key)
            .await;
        assert_eq!(attempts, Some(1));

        tracker
            .mark(request_id, &worker, 0, 0, &coords, false)
            .await;
        let removed = tracker.cleanup_abandoned(request_id, 0).await;
        assert_eq!(removed, 1);
    }
}

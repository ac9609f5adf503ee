use std::collections::HashMap;
use std::sync::Arc;

use serde_json::json;
use time::OffsetDateTime;

use domain::change::Change;
use domain::color::ColorId;
use domain::coords::Coord;
use domain::repair::{RepairPixel, RepairPriority};
use domain::worker::WorkerId;

use crate::change_filter;
use crate::error::AppResult;
use crate::guard_config::service::GuardConfigService;
use crate::lockout::service::LockoutService;
use crate::ports::incoming::repair::{RepairDistributionOutcome, RepairUseCase};
use crate::ports::outgoing::registry::DynRegistryPort;
use crate::preview::service::PreviewProtocol;

/// Repair order fan-out independent of any session (C9). Neither entry
/// point registers assignments in the batch tracker or spends credits:
/// delivery is fire-and-forget, with outcome visibility left to the
/// `repair_ack`/`repair_progress`/`repair_complete`/`repair_error` ingress
/// events.
pub struct RepairService {
    registry: DynRegistryPort,
    lockout: Arc<LockoutService>,
    preview_protocol: Arc<PreviewProtocol>,
    guard_config: Arc<GuardConfigService>,
}

impl RepairService {
    #[must_use]
    pub fn new(
        registry: DynRegistryPort,
        lockout: Arc<LockoutService>,
        preview_protocol: Arc<PreviewProtocol>,
        guard_config: Arc<GuardConfigService>,
    ) -> Self {
        Self {
            registry,
            lockout,
            preview_protocol,
            guard_config,
        }
    }
}

#[async_trait::async_trait]
impl RepairUseCase for RepairService {
    async fn submit(&self, pixels: Vec<RepairPixel>, source: &str) -> AppResult<()> {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let eligible: Vec<RepairPixel> = pixels
            .into_iter()
            .filter(|pixel| !self.lockout.is_locked(pixel.coord, now))
            .collect();

        let mut high = Vec::new();
        let mut medium = Vec::new();
        let mut low = Vec::new();
        for pixel in eligible {
            match pixel.priority {
                RepairPriority::High => high.push(pixel),
                RepairPriority::Medium => medium.push(pixel),
                RepairPriority::Low => low.push(pixel),
            }
        }
        let ordered: Vec<RepairPixel> = high.into_iter().chain(medium).chain(low).collect();
        if ordered.is_empty() {
            return Ok(());
        }

        let workers = self.registry.connected_ids().await;
        if workers.is_empty() {
            return Ok(());
        }

        let shares = even_shares(ordered.len(), workers.len());
        let total_repairs = ordered.len();
        let mut remaining = ordered.into_iter();

        for (worker_id, share) in workers.into_iter().zip(shares) {
            if share == 0 {
                continue;
            }
            let batch: Vec<RepairPixel> = (&mut remaining).take(share).collect();
            send_repair_order(&self.registry, &worker_id, &batch, source, total_repairs).await?;
        }
        Ok(())
    }

    async fn distribute_from_favorite(&self) -> AppResult<RepairDistributionOutcome> {
        let Some(favorite_id) = self.registry.favorite_id().await else {
            return Ok(RepairDistributionOutcome::default());
        };

        let mut preview = self.preview_protocol.read(&favorite_id).await;
        if !preview.as_ref().is_some_and(|preview| preview.detailed) {
            self.preview_protocol.refresh_short(&favorite_id).await?;
            preview = self.preview_protocol.read(&favorite_id).await;
        }

        let Some(preview) = preview.filter(|preview| preview.detailed) else {
            return Ok(RepairDistributionOutcome::default());
        };

        let guard_config = self.guard_config.snapshot();
        let filtered = change_filter::filter_and_sort(&preview.changes, &guard_config);
        if filtered.is_empty() {
            return Ok(RepairDistributionOutcome::default());
        }

        let workers = self.registry.connected_ids().await;
        if workers.is_empty() {
            return Ok(RepairDistributionOutcome::default());
        }

        let mut queues: HashMap<WorkerId, Vec<Change>> = HashMap::new();
        for (index, change) in filtered.iter().enumerate() {
            let worker_index = index % workers.len();
            let Some(worker_id) = workers.get(worker_index) else {
                continue;
            };
            queues.entry(worker_id.clone()).or_default().push(*change);
        }

        let total_repairs = filtered.len();
        let mut workers_used = 0usize;
        for worker_id in &workers {
            let Some(batch) = queues.get(worker_id) else {
                continue;
            };
            if batch.is_empty() {
                continue;
            }
            let pixels: Vec<RepairPixel> = batch
                .iter()
                .map(|change| RepairPixel {
                    coord: change.coord,
                    color: change.expected_color,
                    priority: RepairPriority::Low,
                })
                .collect();
            send_repair_order(&self.registry, worker_id, &pixels, "favorite_preview", total_repairs)
                .await?;
            workers_used += 1;
        }

        Ok(RepairDistributionOutcome {
            distributed: total_repairs,
            workers_used,
        })
    }
}

/// `base = len / n`, remainder `r = len % n` awarded one extra each to the
/// first `r` workers in iteration order.
fn even_shares(len: usize, workers: usize) -> Vec<usize> {
    let base = len / workers;
    let remainder = len % workers;
    (0..workers).map(|index| base + usize::from(index < remainder)).collect()
}

async fn send_repair_order(
    registry: &DynRegistryPort,
    worker_id: &WorkerId,
    pixels: &[RepairPixel],
    source: &str,
    total_repairs: usize,
) -> AppResult<()> {
    let coords: Vec<Coord> = pixels.iter().map(|pixel| pixel.coord).collect();
    let colors: Vec<ColorId> = pixels.iter().map(RepairPixel::color_or_default).collect();
    let payload = json!({
        "type": "repairOrder",
        "coords": coords,
        "colors": colors,
        "source": source,
        "total_repairs": total_repairs,
    });
    registry.send_to_slave(worker_id, payload).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn even_shares_distributes_remainder_to_first_workers() {
        let shares = even_shares(7, 3);
        assert_eq!(shares, vec![3, 2, 2]);
        assert_eq!(shares.iter().sum::<usize>(), 7);
    }

    #[test]
    fn even_shares_handles_fewer_items_than_workers() {
        let shares = even_shares(2, 5);
        assert_eq!(shares, vec![1, 1, 0, 0, 0]);
    }
}

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use serde_json::json;

use domain::batch::RequestId;
use domain::change::Change;
use domain::coords::TileCoord;
use domain::worker::WorkerId;

use crate::batch_tracker::service::BatchTrackerService;
use crate::error::AppResult;
use crate::infrastructure_config::DispatchConfig;
use crate::ports::outgoing::registry::DynRegistryPort;

/// Tile-grouping, per-tile pacing, payload framing, and batch-tracker
/// registration for one worker's quota-sized share of a round (C6).
pub struct DispatchPipeline {
    registry: DynRegistryPort,
    batch_tracker: Arc<BatchTrackerService>,
    config: DispatchConfig,
}

impl DispatchPipeline {
    #[must_use]
    pub fn new(
        registry: DynRegistryPort,
        batch_tracker: Arc<BatchTrackerService>,
        config: DispatchConfig,
    ) -> Self {
        Self {
            registry,
            batch_tracker,
            config,
        }
    }

    /// Groups `items` by dispatch tile in first-appearance order, registers
    /// each tile's payload with the batch tracker, and sends it to
    /// `slave_id`. Consecutive tiles for the same worker are paced with a
    /// uniform random delay; the first tile is sent immediately.
    pub async fn dispatch(
        &self,
        slave_id: &WorkerId,
        items: &[Change],
        request_id: RequestId,
    ) -> AppResult<()> {
        let tiles = group_by_tile(items);

        let mut first = true;
        for (tile, changes) in tiles {
            if !first {
                let delay = rand::rng().random_range(
                    self.config.inter_tile_delay_min_secs..=self.config.inter_tile_delay_max_secs,
                );
                tokio::time::sleep(Duration::from_secs_f64(delay)).await;
            }
            first = false;
            self.dispatch_tile(slave_id, tile, &changes, request_id).await?;
        }
        Ok(())
    }

    /// Resends a single already-grouped tile payload to a (possibly
    /// different) worker during the retry loop, without re-pacing.
    pub async fn resend_tile(
        &self,
        slave_id: &WorkerId,
        tile: TileCoord,
        changes: &[Change],
        request_id: RequestId,
    ) -> AppResult<()> {
        self.dispatch_tile(slave_id, tile, changes, request_id).await
    }

    async fn dispatch_tile(
        &self,
        slave_id: &WorkerId,
        tile: TileCoord,
        changes: &[Change],
        request_id: RequestId,
    ) -> AppResult<()> {
        let coords: Vec<_> = changes.iter().map(|c| c.coord).collect();
        let colors: Vec<_> = changes.iter().map(Change::color_or_default).collect();
        let batch_size = coords.len();

        self.batch_tracker
            .assign(
                request_id,
                slave_id.clone(),
                tile.x,
                tile.y,
                coords.clone(),
                colors.clone(),
                0,
            )
            .await;

        let payload = json!({
            "type": "paintBatch",
            "tileX": tile.x,
            "tileY": tile.y,
            "coords": coords,
            "colors": colors,
            "requestId": request_id.to_string(),
            "batchSize": batch_size,
        });
        self.registry.send_to_slave(slave_id, payload).await
    }
}

/// Groups changes by dispatch tile, preserving first-appearance order of
/// the tile key (not a sort over `(tx, ty)`).
fn group_by_tile(items: &[Change]) -> Vec<(TileCoord, Vec<Change>)> {
    let mut tiles: Vec<(TileCoord, Vec<Change>)> = Vec::new();
    for &item in items {
        let tile = item.coord.tile();
        if let Some((_, bucket)) = tiles.iter_mut().find(|(t, _)| *t == tile) {
            bucket.push(item);
        } else {
            tiles.push((tile, vec![item]));
        }
    }
    tiles
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::change::ChangeType;
    use domain::color::ColorId;
    use domain::coords::Coord;

    fn change(x: i32, y: i32) -> Change {
        Change::new(Coord::new(x, y), ChangeType::Missing, Some(ColorId::new(2)))
    }

    #[test]
    fn groups_preserve_first_appearance_order() {
        let items = vec![change(1500, 200), change(10, 10), change(1600, 250), change(20, 20)];
        let tiles = group_by_tile(&items);
        let keys: Vec<TileCoord> = tiles.iter().map(|(tile, _)| *tile).collect();
        assert_eq!(keys, vec![TileCoord::new(1, 0), TileCoord::new(0, 0)]);
        for (_, changes) in &tiles {
            assert_eq!(changes.len(), 2);
        }
    }
}

use serde::Serialize;

use domain::repair::RepairPixel;

use crate::error::AppResult;

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct RepairDistributionOutcome {
    pub distributed: usize,
    pub workers_used: usize,
}

#[async_trait::async_trait]
pub trait RepairUseCase: Send + Sync {
    async fn submit(&self, pixels: Vec<RepairPixel>, source: &str) -> AppResult<()>;
    async fn distribute_from_favorite(&self) -> AppResult<RepairDistributionOutcome>;
}

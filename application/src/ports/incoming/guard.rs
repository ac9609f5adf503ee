use domain::guard_config::GuardConfig;
use domain::worker::Preview;

use crate::error::AppResult;

#[async_trait::async_trait]
pub trait GuardConfigUseCase: Send + Sync {
    async fn get(&self) -> GuardConfig;
    async fn update(&self, partial: GuardConfig) -> AppResult<(GuardConfig, Vec<&'static str>)>;
    async fn clear(&self) -> AppResult<()>;
    async fn check(&self) -> AppResult<()>;
    async fn repair(&self) -> AppResult<()>;
    async fn preview(&self) -> AppResult<Option<Preview>>;
}

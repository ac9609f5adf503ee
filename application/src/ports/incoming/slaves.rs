use domain::color::ColorId;
use domain::coords::Coord;
use domain::worker::{Worker, WorkerId};

use crate::error::AppResult;
use crate::ports::outgoing::registry::SetFavoriteOutcome;

#[async_trait::async_trait]
pub trait SlavesUseCase: Send + Sync {
    async fn list(&self) -> Vec<Worker>;
    async fn set_favorite(&self, id: &WorkerId) -> AppResult<SetFavoriteOutcome>;
    async fn paint(
        &self,
        id: &WorkerId,
        coords: Vec<Coord>,
        colors: Vec<ColorId>,
    ) -> AppResult<()>;
}

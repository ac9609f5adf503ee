use serde::Deserialize;
use serde_json::Value;

use domain::color::ColorId;
use domain::coords::Coord;
use domain::repair::RepairPixel;

#[derive(Debug, Deserialize)]
pub struct PaintRequest {
    pub coords: Vec<Coord>,
    pub colors: Vec<ColorId>,
}

#[derive(Debug, Deserialize)]
pub struct RepairSubmitRequest {
    pub pixels: Vec<RepairPixel>,
    #[serde(default = "default_source")]
    pub source: String,
}

fn default_source() -> String {
    "external".to_string()
}

#[derive(Debug, Deserialize)]
pub struct GuardUploadRequest {
    pub filename: String,
    pub data: Value,
}

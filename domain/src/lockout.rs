use crate::coords::Coord;

/// Decimal pair key format used by the recent-repair lockout, e.g. `"10,20"`.
#[must_use]
pub fn coord_key(coord: Coord) -> String {
    format!("{},{}", coord.x, coord.y)
}

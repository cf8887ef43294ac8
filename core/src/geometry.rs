//! Geometry and visibility helpers. Pure functions, no state.

use crate::{
    types::{CellId, Position},
    world::{TileGrid, TileKind},
};

/// Side length of a reputation cell, in tiles.
pub const DEFAULT_CELL_SIZE: f64 = 12.0;

/// Distance between interpolated line-of-sight samples, in tiles.
pub const LOS_SAMPLE_STEP: f64 = 1.25;

/// Floor applied to a line-of-sight fraction; a fully walled line still
/// leaks a little sound and movement.
pub const MIN_LINE_OF_SIGHT: f64 = 0.1;

/// Clamp that never propagates NaN: NaN and -inf map to `min`, +inf to `max`.
pub fn clamp(value: f64, min: f64, max: f64) -> f64 {
    if value.is_nan() {
        return min;
    }
    value.max(min).min(max)
}

/// NaN becomes 0 and infinities saturate to the largest finite magnitude,
/// so the value survives a JSON round trip.
pub fn finite(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(f64::MIN, f64::MAX)
}

/// Clamp to the unit interval.
pub fn clamp01(value: f64) -> f64 {
    clamp(value, 0.0, 1.0)
}

pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

pub fn distance_between(a: Position, b: Position) -> f64 {
    let dx = a.x - b.x;
    let dy = a.y - b.y;
    (dx * dx + dy * dy).sqrt()
}

/// Bucket a position into a `"{x}:{y}"` cell id.
pub fn resolve_cell_id(position: Position, cell_size: f64) -> CellId {
    let cell_x = (position.x / cell_size).floor() as i64;
    let cell_y = (position.y / cell_size).floor() as i64;
    format!("{cell_x}:{cell_y}")
}

/// Points strictly between `from` and `to`, roughly `step` apart.
/// Always yields at least one point.
pub fn interpolated_points(from: Position, to: Position, step: f64) -> impl Iterator<Item = Position> {
    let distance = distance_between(from, to);
    let steps = ((distance / step).floor() as usize).max(1);
    (1..=steps).map(move |i| {
        let t = i as f64 / (steps + 1) as f64;
        Position::new(lerp(from.x, to.x, t), lerp(from.y, to.y, t))
    })
}

/// Fraction of the line between two points that is unobstructed.
///
/// Walls, unwalkable tiles and tiles outside the grid block fully;
/// doors block half. Result is in [MIN_LINE_OF_SIGHT, 1].
pub fn sample_line_of_sight(grid: &dyn TileGrid, from: Position, to: Position) -> f64 {
    let mut obstruction = 0.0;
    let mut samples = 0usize;

    for point in interpolated_points(from, to, LOS_SAMPLE_STEP) {
        let x = point.x.round() as i64;
        let y = point.y.round() as i64;
        obstruction += match grid.tile_at(x, y) {
            None => 1.0,
            Some(tile) if !tile.walkable || tile.kind == TileKind::Wall => 1.0,
            Some(tile) if tile.kind == TileKind::Door => 0.5,
            Some(_) => 0.0,
        };
        samples += 1;
    }

    if samples == 0 {
        return 1.0;
    }
    clamp(1.0 - obstruction / samples as f64, MIN_LINE_OF_SIGHT, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_handles_non_finite_input() {
        assert_eq!(clamp(f64::NAN, 0.0, 1.0), 0.0);
        assert_eq!(clamp(f64::INFINITY, 0.0, 1.0), 1.0);
        assert_eq!(clamp(f64::NEG_INFINITY, -40.0, 40.0), -40.0);
        assert_eq!(clamp(0.3, 0.0, 1.0), 0.3);
    }

    #[test]
    fn finite_pins_nan_and_saturates_infinities() {
        assert_eq!(finite(f64::NAN), 0.0);
        assert_eq!(finite(f64::INFINITY), f64::MAX);
        assert_eq!(finite(f64::NEG_INFINITY), f64::MIN);
        assert_eq!(finite(-3.5), -3.5);
    }

    #[test]
    fn cell_ids_floor_negative_coordinates() {
        assert_eq!(resolve_cell_id(Position::new(5.0, 5.0), 12.0), "0:0");
        assert_eq!(resolve_cell_id(Position::new(12.0, 25.0), 12.0), "1:2");
        assert_eq!(resolve_cell_id(Position::new(-0.5, 3.0), 12.0), "-1:0");
    }

    #[test]
    fn interpolation_yields_interior_points_only() {
        let from = Position::new(0.0, 0.0);
        let to = Position::new(10.0, 0.0);
        let points: Vec<_> = interpolated_points(from, to, 1.25).collect();
        assert_eq!(points.len(), 8);
        assert!(points.iter().all(|p| p.x > 0.0 && p.x < 10.0));

        let same: Vec<_> = interpolated_points(from, from, 1.25).collect();
        assert_eq!(same.len(), 1);
    }
}

//! Projection of a distance travelled along a segment onto its polyline.
//!
//! The polyline is split into `n - 1` logical spans of equal weight,
//! regardless of their real geographic length. Visual progress is therefore
//! ratio-accurate but not distance-accurate along uneven track.

use geo::{Coord, LineString};

/// Position at `distance` meters along a segment of `total_length` meters
/// drawn as `polyline`.
///
/// Out-of-range distances are clamped to the segment ends. Returns `None`
/// only for an empty polyline.
pub fn project(polyline: &[Coord<f64>], distance: f64, total_length: f64) -> Option<Coord<f64>> {
    match polyline {
        [] => return None,
        [only] => return Some(*only),
        _ => {}
    }

    let ratio = distance / total_length;
    let ratio = if ratio.is_finite() {
        ratio.clamp(0.0, 1.0)
    } else if ratio == f64::INFINITY {
        1.0
    } else {
        0.0
    };

    let spans = polyline.len() - 1;
    let index = ratio * spans as f64;
    let span = (index.floor() as usize).min(spans - 1);
    let t = index - span as f64;

    Some(lerp(polyline[span], polyline[span + 1], t))
}

/// Same as [`project`] over a geo `LineString`.
pub fn project_on(line: &LineString<f64>, distance: f64, total_length: f64) -> Option<Coord<f64>> {
    project(&line.0, distance, total_length)
}

// a * (1 - t) + b * t is exact at both ends, unlike a + (b - a) * t
fn lerp(a: Coord<f64>, b: Coord<f64>, t: f64) -> Coord<f64> {
    Coord {
        x: a.x * (1.0 - t) + b.x * t,
        y: a.y * (1.0 - t) + b.y * t,
    }
}

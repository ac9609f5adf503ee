use std::cmp::Ordering;

use rand::Rng;
use rand::seq::SliceRandom;

use domain::change::Change;

#[derive(Clone, Copy)]
struct BBox {
    min_x: f64,
    min_y: f64,
    max_x: f64,
    max_y: f64,
}

impl BBox {
    fn of(changes: &[Change]) -> Self {
        let mut min_x = f64::INFINITY;
        let mut min_y = f64::INFINITY;
        let mut max_x = f64::NEG_INFINITY;
        let mut max_y = f64::NEG_INFINITY;
        for change in changes {
            let x = f64::from(change.coord.x);
            let y = f64::from(change.coord.y);
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
        if changes.is_empty() {
            return Self {
                min_x: 0.0,
                min_y: 0.0,
                max_x: 0.0,
                max_y: 0.0,
            };
        }
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    fn center(&self) -> (f64, f64) {
        ((self.min_x + self.max_x) / 2.0, (self.min_y + self.max_y) / 2.0)
    }

    fn width(&self) -> f64 {
        (self.max_x - self.min_x).max(1.0)
    }

    fn corners(&self) -> [(f64, f64); 4] {
        [
            (self.min_x, self.min_y),
            (self.max_x, self.min_y),
            (self.min_x, self.max_y),
            (self.max_x, self.max_y),
        ]
    }

    /// Distance from `(x, y)` to the nearest edge of the box.
    fn edge_distance(&self, x: f64, y: f64) -> f64 {
        (x - self.min_x)
            .min(self.max_x - x)
            .min(y - self.min_y)
            .min(self.max_y - y)
    }
}

fn euclid(x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
    ((x1 - x2).powi(2) + (y1 - y2).powi(2)).sqrt()
}

fn xy(change: &Change) -> (f64, f64) {
    (f64::from(change.coord.x), f64::from(change.coord.y))
}

fn sort_by_key_f64(changes: &mut [Change], mut key: impl FnMut(&Change) -> f64) {
    changes.sort_by(|a, b| key(a).total_cmp(&key(b)));
}

pub fn random(changes: &[Change], rng: &mut impl Rng) -> Vec<Change> {
    let mut out = changes.to_vec();
    out.shuffle(rng);
    out
}

pub fn line_up(changes: &[Change]) -> Vec<Change> {
    let mut out = changes.to_vec();
    out.sort_by_key(|c| (c.coord.y, c.coord.x));
    out
}

pub fn line_down(changes: &[Change]) -> Vec<Change> {
    let mut out = changes.to_vec();
    out.sort_by(|a, b| match b.coord.y.cmp(&a.coord.y) {
        Ordering::Equal => a.coord.x.cmp(&b.coord.x),
        other => other,
    });
    out
}

pub fn line_left(changes: &[Change]) -> Vec<Change> {
    let mut out = changes.to_vec();
    out.sort_by_key(|c| (c.coord.x, c.coord.y));
    out
}

pub fn line_right(changes: &[Change]) -> Vec<Change> {
    let mut out = changes.to_vec();
    out.sort_by(|a, b| match b.coord.x.cmp(&a.coord.x) {
        Ordering::Equal => a.coord.y.cmp(&b.coord.y),
        other => other,
    });
    out
}

/// `lineUp` with row direction alternating by row index parity.
pub fn zigzag(changes: &[Change]) -> Vec<Change> {
    let mut rows: Vec<i32> = changes.iter().map(|c| c.coord.y).collect();
    rows.sort_unstable();
    rows.dedup();

    let mut out = line_up(changes);
    out.sort_by(|a, b| {
        let row_a = rows.binary_search(&a.coord.y).unwrap_or(0);
        let row_b = rows.binary_search(&b.coord.y).unwrap_or(0);
        match row_a.cmp(&row_b) {
            Ordering::Equal => {
                if row_a % 2 == 1 {
                    b.coord.x.cmp(&a.coord.x)
                } else {
                    a.coord.x.cmp(&b.coord.x)
                }
            }
            other => other,
        }
    });
    out
}

pub fn diagonal(changes: &[Change]) -> Vec<Change> {
    let mut out = changes.to_vec();
    out.sort_by_key(|c| (c.coord.x + c.coord.y, c.coord.x));
    out
}

pub fn center(changes: &[Change]) -> Vec<Change> {
    let bbox = BBox::of(changes);
    let (cx, cy) = bbox.center();
    let mut out = changes.to_vec();
    sort_by_key_f64(&mut out, |c| {
        let (x, y) = xy(c);
        euclid(x, y, cx, cy)
    });
    out
}

pub fn borders(changes: &[Change]) -> Vec<Change> {
    let bbox = BBox::of(changes);
    let mut out = changes.to_vec();
    sort_by_key_f64(&mut out, |c| {
        let (x, y) = xy(c);
        bbox.edge_distance(x, y)
    });
    out
}

pub fn corners(changes: &[Change]) -> Vec<Change> {
    let bbox = BBox::of(changes);
    let corners = bbox.corners();
    let mut out = changes.to_vec();
    sort_by_key_f64(&mut out, |c| {
        let (x, y) = xy(c);
        corners
            .iter()
            .map(|&(cx, cy)| euclid(x, y, cx, cy))
            .fold(f64::INFINITY, f64::min)
    });
    out
}

pub fn spiral(changes: &[Change], counter_clockwise: bool) -> Vec<Change> {
    let bbox = BBox::of(changes);
    let (cx, cy) = bbox.center();
    let mut out = changes.to_vec();
    out.sort_by(|a, b| {
        let (ax, ay) = xy(a);
        let (bx, by) = xy(b);
        let ra = (((ax - cx).powi(2) + (ay - cy).powi(2)).sqrt() * 1000.0).round() / 1000.0;
        let rb = (((bx - cx).powi(2) + (by - cy).powi(2)).sqrt() * 1000.0).round() / 1000.0;
        match ra.total_cmp(&rb) {
            Ordering::Equal => {
                let mut ta = (ay - cy).atan2(ax - cx);
                let mut tb = (by - cy).atan2(bx - cx);
                if counter_clockwise {
                    ta = -ta;
                    tb = -tb;
                }
                ta.total_cmp(&tb)
            }
            other => other,
        }
    });
    out
}

pub fn cluster(changes: &[Change], rng: &mut impl Rng) -> Vec<Change> {
    let Some(seed) = changes.choose(rng) else {
        return Vec::new();
    };
    let (sx, sy) = xy(seed);
    let mut out = changes.to_vec();
    sort_by_key_f64(&mut out, |c| {
        let (x, y) = xy(c);
        euclid(x, y, sx, sy)
    });
    out
}

pub fn wave(changes: &[Change]) -> Vec<Change> {
    let bbox = BBox::of(changes);
    let width = bbox.width();
    let mut out = changes.to_vec();
    out.sort_by(|a, b| {
        let key = |c: &Change| {
            let (x, y) = xy(c);
            let nx = (x - bbox.min_x) / width;
            let wave_y = 10.0 * (2.0 * std::f64::consts::PI * nx).sin();
            ((y - wave_y).abs(), x)
        };
        let (da, xa) = key(a);
        let (db, xb) = key(b);
        match da.total_cmp(&db) {
            Ordering::Equal => xa.total_cmp(&xb),
            other => other,
        }
    });
    out
}

pub fn sweep(changes: &[Change]) -> Vec<Change> {
    let mut out = changes.to_vec();
    out.sort_by_key(|c| (c.coord.y.div_euclid(8), c.coord.x.div_euclid(8)));
    out
}

pub fn priority(changes: &[Change], rng: &mut impl Rng) -> Vec<Change> {
    let bbox = BBox::of(changes);
    let (cx, cy) = bbox.center();
    let mut weighted: Vec<(f64, Change)> = changes
        .iter()
        .map(|c| {
            let (x, y) = xy(c);
            let center_distance = euclid(x, y, cx, cy);
            let edge_distance = bbox.edge_distance(x, y);
            let weight =
                0.4f64.mul_add(center_distance, -0.3 * edge_distance) + rng.random_range(0.0..0.3);
            (weight, *c)
        })
        .collect();
    weighted.sort_by(|a, b| a.0.total_cmp(&b.0));
    weighted.into_iter().map(|(_, c)| c).collect()
}

pub fn proximity(changes: &[Change], rng: &mut impl Rng) -> Vec<Change> {
    if changes.is_empty() {
        return Vec::new();
    }
    let mut remaining = changes.to_vec();
    let start = rng.random_range(0..remaining.len());
    let mut out = vec![remaining.swap_remove(start)];
    while !remaining.is_empty() {
        let Some(&(lx, ly)) = out.last().map(xy).as_ref() else {
            break;
        };
        let mut best_idx = 0;
        let mut best_dist = f64::INFINITY;
        for (i, candidate) in remaining.iter().enumerate() {
            let (x, y) = xy(candidate);
            let d = euclid(x, y, lx, ly);
            if d < best_dist {
                best_dist = d;
                best_idx = i;
            }
        }
        out.push(remaining.swap_remove(best_idx));
    }
    out
}

pub fn quadrant(changes: &[Change]) -> Vec<Change> {
    let bbox = BBox::of(changes);
    let (cx, cy) = bbox.center();
    let mut top_left = Vec::new();
    let mut top_right = Vec::new();
    let mut bottom_left = Vec::new();
    let mut bottom_right = Vec::new();
    for change in changes {
        let (x, y) = xy(change);
        match (x < cx, y < cy) {
            (true, true) => top_left.push(*change),
            (false, true) => top_right.push(*change),
            (true, false) => bottom_left.push(*change),
            (false, false) => bottom_right.push(*change),
        }
    }
    let mut buckets = [top_left, top_right, bottom_left, bottom_right];
    let mut out = Vec::with_capacity(changes.len());
    loop {
        let mut pushed = false;
        for bucket in &mut buckets {
            if let Some(change) = (!bucket.is_empty()).then(|| bucket.remove(0)) {
                out.push(change);
                pushed = true;
            }
        }
        if !pushed {
            break;
        }
    }
    out
}

pub fn scattered(changes: &[Change], rng: &mut impl Rng) -> Vec<Change> {
    if changes.is_empty() {
        return Vec::new();
    }
    let mut remaining = changes.to_vec();
    let start = rng.random_range(0..remaining.len());
    let mut out = vec![remaining.swap_remove(start)];
    while !remaining.is_empty() {
        let mut best_idx = 0;
        let mut best_min_dist = f64::NEG_INFINITY;
        for (i, candidate) in remaining.iter().enumerate() {
            let (x, y) = xy(candidate);
            let min_dist = out
                .iter()
                .map(|chosen| {
                    let (cx, cy) = xy(chosen);
                    euclid(x, y, cx, cy)
                })
                .fold(f64::INFINITY, f64::min);
            if min_dist > best_min_dist {
                best_min_dist = min_dist;
                best_idx = i;
            }
        }
        out.push(remaining.swap_remove(best_idx));
    }
    out
}

pub fn biased_random(changes: &[Change], rng: &mut impl Rng) -> Vec<Change> {
    let bbox = BBox::of(changes);
    let mut weighted: Vec<(f64, Change)> = changes
        .iter()
        .map(|c| {
            let (x, y) = xy(c);
            let weight = 1.0 / (bbox.edge_distance(x, y) + 1.0) + rng.random_range(0.0..0.5);
            (weight, *c)
        })
        .collect();
    weighted.sort_by(|a, b| b.0.total_cmp(&a.0));
    weighted.into_iter().map(|(_, c)| c).collect()
}

pub fn anchor_points(changes: &[Change]) -> Vec<Change> {
    let bbox = BBox::of(changes);
    let (cx, cy) = bbox.center();
    let mut anchors: Vec<(f64, f64, u8)> = bbox
        .corners()
        .into_iter()
        .map(|(x, y)| (x, y, 1u8))
        .collect();
    anchors.push((cx, cy, 2));
    anchors.push(((bbox.min_x + bbox.max_x) / 2.0, bbox.min_y, 3));
    anchors.push(((bbox.min_x + bbox.max_x) / 2.0, bbox.max_y, 3));
    anchors.push((bbox.min_x, (bbox.min_y + bbox.max_y) / 2.0, 3));
    anchors.push((bbox.max_x, (bbox.min_y + bbox.max_y) / 2.0, 3));

    let mut out = changes.to_vec();
    out.sort_by(|a, b| {
        let key = |c: &Change| {
            let (x, y) = xy(c);
            let mut best_priority = u8::MAX;
            let mut best_distance = f64::INFINITY;
            for &(ax, ay, priority) in &anchors {
                let distance = euclid(x, y, ax, ay);
                if distance < best_distance {
                    best_distance = distance;
                    best_priority = priority;
                }
            }
            (best_priority, best_distance)
        };
        let (pa, da) = key(a);
        let (pb, db) = key(b);
        match pa.cmp(&pb) {
            Ordering::Equal => da.total_cmp(&db),
            other => other,
        }
    });
    out
}

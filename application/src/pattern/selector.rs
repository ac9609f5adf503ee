use rand::Rng;

use domain::change::Change;

use super::patterns;

/// Orders `changes` by the named geometric pattern and returns the first `n`
/// elements. Unknown names fall back to a uniform random shuffle, as does
/// any pattern whose preconditions the input fails to satisfy. Never
/// mutates `changes`.
#[must_use]
pub fn select(name: &str, changes: &[Change], n: usize, rng: &mut impl Rng) -> Vec<Change> {
    let ordered = match name {
        "lineUp" => patterns::line_up(changes),
        "lineDown" => patterns::line_down(changes),
        "lineLeft" => patterns::line_left(changes),
        "lineRight" => patterns::line_right(changes),
        "zigzag" | "snake" => patterns::zigzag(changes),
        "diagonal" | "diagonalSweep" => patterns::diagonal(changes),
        "center" => patterns::center(changes),
        "borders" => patterns::borders(changes),
        "corners" => patterns::corners(changes),
        "spiral" | "spiralClockwise" => patterns::spiral(changes, false),
        "spiralCounterClockwise" => patterns::spiral(changes, true),
        "cluster" => patterns::cluster(changes, rng),
        "wave" => patterns::wave(changes),
        "sweep" => patterns::sweep(changes),
        "priority" => patterns::priority(changes, rng),
        "proximity" => patterns::proximity(changes, rng),
        "quadrant" => patterns::quadrant(changes),
        "scattered" => patterns::scattered(changes, rng),
        "biasedRandom" => patterns::biased_random(changes, rng),
        "anchorPoints" => patterns::anchor_points(changes),
        _ => patterns::random(changes, rng),
    };
    ordered.into_iter().take(n).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::color::ColorId;
    use domain::coords::Coord;

    fn change(x: i32, y: i32) -> Change {
        Change::new(Coord::new(x, y), domain::change::ChangeType::Missing, Some(ColorId::new(1)))
    }

    #[test]
    fn line_up_sorts_rows_then_columns() {
        let changes = vec![change(5, 1), change(1, 1), change(0, 0)];
        let mut rng = rand::rng();
        let ordered = select("lineUp", &changes, 3, &mut rng);
        assert_eq!(
            ordered.iter().map(|c| (c.coord.y, c.coord.x)).collect::<Vec<_>>(),
            vec![(0, 0), (1, 1), (1, 5)]
        );
    }

    #[test]
    fn unknown_name_falls_back_to_random_without_panicking() {
        let changes = vec![change(0, 0), change(1, 1)];
        let mut rng = rand::rng();
        let ordered = select("not-a-real-pattern", &changes, 2, &mut rng);
        assert_eq!(ordered.len(), 2);
    }

    #[test]
    fn never_mutates_input() {
        let changes = vec![change(3, 3), change(1, 1), change(2, 2)];
        let original = changes.clone();
        let mut rng = rand::rng();
        let _ = select("center", &changes, 2, &mut rng);
        assert_eq!(changes, original);
    }

    #[test]
    fn n_caps_output_length() {
        let changes = vec![change(0, 0), change(1, 1), change(2, 2)];
        let mut rng = rand::rng();
        let ordered = select("diagonal", &changes, 1, &mut rng);
        assert_eq!(ordered.len(), 1);
    }
}

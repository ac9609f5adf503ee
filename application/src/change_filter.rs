use domain::change::Change;
use domain::guard_config::GuardConfig;

/// Shared preview-to-queue filter/sort used by both the session orchestrator
/// (main loop step 2) and the favorite-analysis branch of the repair
/// distribution service: keeps only repairable changes, drops excluded
/// colors, and stably sorts missing/incorrect ahead of absent, with
/// preferred colors ahead of the rest within each bucket.
#[must_use]
pub fn filter_and_sort(changes: &[Change], guard_config: &GuardConfig) -> Vec<Change> {
    let exclude_color = guard_config.exclude_color();
    let excluded = guard_config.excluded_color_ids();
    let prefer_color = guard_config.prefer_color();
    let preferred = guard_config.preferred_color_ids();

    let mut filtered: Vec<Change> = changes
        .iter()
        .copied()
        .filter(Change::is_repairable)
        .filter(|change| {
            if !exclude_color {
                return true;
            }
            !change.expected_color.is_some_and(|color| excluded.contains(&color))
        })
        .collect();

    filtered.sort_by_key(|change| {
        let not_priority_type = !change.change_type.is_missing_or_incorrect();
        let not_preferred = prefer_color
            && !change.expected_color.is_some_and(|color| preferred.contains(&color));
        (not_priority_type, not_preferred)
    });
    filtered
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::change::ChangeType;
    use domain::color::ColorId;
    use domain::coords::Coord;

    fn change(x: i32, change_type: ChangeType, color: i64) -> Change {
        Change::new(Coord::new(x, 0), change_type, Some(ColorId::new(color)))
    }

    #[test]
    fn drops_correct_changes() {
        let changes = vec![change(0, ChangeType::Correct, 1), change(1, ChangeType::Missing, 2)];
        let result = filter_and_sort(&changes, &GuardConfig::default());
        assert_eq!(result.len(), 1);
        assert_eq!(result.first().map(|c| c.change_type), Some(ChangeType::Missing));
    }

    #[test]
    fn missing_and_incorrect_sort_before_absent() {
        let changes = vec![
            change(0, ChangeType::Absent, 1),
            change(1, ChangeType::Missing, 1),
            change(2, ChangeType::Incorrect, 1),
        ];
        let result = filter_and_sort(&changes, &GuardConfig::default());
        let types: Vec<ChangeType> = result.iter().map(|c| c.change_type).collect();
        assert_eq!(types, vec![ChangeType::Missing, ChangeType::Incorrect, ChangeType::Absent]);
    }

    #[test]
    fn excludes_configured_colors() {
        let guard_config = GuardConfig {
            exclude_color: Some(true),
            excluded_color_ids: Some([ColorId::new(9)].into_iter().collect()),
            ..GuardConfig::default()
        };
        let changes = vec![change(0, ChangeType::Missing, 9), change(1, ChangeType::Missing, 1)];
        let result = filter_and_sort(&changes, &guard_config);
        assert_eq!(result.len(), 1);
        assert_eq!(result.first().and_then(|c| c.expected_color), Some(ColorId::new(1)));
    }

    #[test]
    fn preferred_colors_sort_first_within_type_bucket() {
        let guard_config = GuardConfig {
            prefer_color: Some(true),
            preferred_color_ids: Some([ColorId::new(7)].into_iter().collect()),
            ..GuardConfig::default()
        };
        let changes = vec![change(0, ChangeType::Missing, 1), change(1, ChangeType::Missing, 7)];
        let result = filter_and_sort(&changes, &guard_config);
        assert_eq!(result.first().and_then(|c| c.expected_color), Some(ColorId::new(7)));
    }
}

//! Timeline projector
//!
//! Maps a resource's assignment history onto a fixed month-grid window for
//! the track-record visualization. Pure and stateless: same inputs, same
//! bars, no I/O.

use chrono::{Datelike, NaiveDate};
use rm_core::traits::Id;
use rm_core::types::months_between;
use rm_models::{Assignment, ProjectStatus};
use serde::Serialize;

/// Months shown in the grid: 4 before the center month, the center month,
/// and 4 after.
pub const DEFAULT_WINDOW_MONTHS: u32 = 9;

/// How many assignment rows the grid displays, most recent first.
pub const DEFAULT_ROW_CAP: usize = 4;

/// Presentation category of a bar; drives its color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BarCategory {
    Ongoing,
    Hold,
    Closed,
}

/// An assignment joined with the project facts the grid needs.
#[derive(Debug, Clone)]
pub struct TimelineEntry {
    pub assignment: Assignment,
    pub project_name: String,
    pub project_status: ProjectStatus,
}

/// One positioned bar in the grid.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionedBar {
    pub assignment_id: Option<Id>,
    pub project_name: String,
    pub role: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Grid column the bar starts in, `0..window_size`
    pub start_col: u32,
    /// Exclusive end column, `0..=window_size`
    pub end_col: u32,
    /// Offset from the left edge as a fraction of the grid width
    pub left_fraction: f64,
    /// Bar width as a fraction of the grid width
    pub width_fraction: f64,
    pub category: BarCategory,
}

/// First day of the month `offset` months away from `date`'s month.
fn month_floor_offset(date: NaiveDate, offset: i32) -> NaiveDate {
    let months = date.year() * 12 + date.month() as i32 - 1 + offset;
    let year = months.div_euclid(12);
    let month = months.rem_euclid(12) as u32 + 1;
    NaiveDate::from_ymd_opt(year, month, 1).expect("month arithmetic stays in range")
}

/// The first day of the window that centers on `window_center`'s month.
pub fn window_start(window_center: NaiveDate, window_size: u32) -> NaiveDate {
    month_floor_offset(window_center, -((window_size as i32) / 2))
}

fn clamp_col(value: i32, window_size: u32) -> u32 {
    value.clamp(0, window_size as i32) as u32
}

fn category(entry: &TimelineEntry, today: NaiveDate) -> BarCategory {
    let assignment = &entry.assignment;
    if entry.project_status == ProjectStatus::Closed
        || !assignment.is_active()
        || assignment.end_date < today
    {
        BarCategory::Closed
    } else if entry.project_status == ProjectStatus::Hold {
        BarCategory::Hold
    } else {
        BarCategory::Ongoing
    }
}

/// Project the entries onto the grid.
///
/// Assignments are ordered most recent first and capped at `row_cap`;
/// assignments entirely outside the window collapse to zero width and are
/// dropped from the result.
pub fn project_timeline(
    entries: &[TimelineEntry],
    window_center: NaiveDate,
    window_size: u32,
    row_cap: usize,
    today: NaiveDate,
) -> Vec<PositionedBar> {
    let start = window_start(window_center, window_size);

    let mut ordered: Vec<&TimelineEntry> = entries.iter().collect();
    ordered.sort_by(|a, b| {
        b.assignment
            .start_date
            .cmp(&a.assignment.start_date)
            .then(b.assignment.id.cmp(&a.assignment.id))
    });

    ordered
        .into_iter()
        .take(row_cap)
        .filter_map(|entry| {
            let assignment = &entry.assignment;
            let start_col = clamp_col(months_between(start, assignment.start_date), window_size);
            let end_col = clamp_col(
                months_between(start, assignment.end_date) + 1,
                window_size,
            );
            if end_col <= start_col {
                // Entirely outside the window.
                return None;
            }
            let size = window_size as f64;
            Some(PositionedBar {
                assignment_id: assignment.id,
                project_name: entry.project_name.clone(),
                role: assignment.role.clone(),
                start_date: assignment.start_date,
                end_date: assignment.end_date,
                start_col,
                end_col,
                left_fraction: start_col as f64 / size,
                width_fraction: (end_col - start_col) as f64 / size,
                category: category(entry, today),
            })
        })
        .collect()
}

/// Joins ledger data into [`TimelineEntry`]s and runs the projection.
pub struct TimelineService {
    store: std::sync::Arc<dyn crate::store::LedgerStore>,
}

impl TimelineService {
    pub fn new(store: std::sync::Arc<dyn crate::store::LedgerStore>) -> Self {
        Self { store }
    }

    pub async fn for_resource(
        &self,
        resource_id: Id,
        window_center: NaiveDate,
        today: NaiveDate,
    ) -> rm_core::result::RmResult<Vec<PositionedBar>> {
        self.store.resource(resource_id).await?;
        let assignments = self.store.assignments_for_resource(resource_id).await?;
        let projects = self.store.projects().await?;

        let entries: Vec<TimelineEntry> = assignments
            .into_iter()
            .filter_map(|assignment| {
                let project = projects
                    .iter()
                    .find(|p| p.id == Some(assignment.project_id))?;
                Some(TimelineEntry {
                    project_name: project.name.clone(),
                    project_status: project.status,
                    assignment,
                })
            })
            .collect();

        Ok(project_timeline(
            &entries,
            window_center,
            DEFAULT_WINDOW_MONTHS,
            DEFAULT_ROW_CAP,
            today,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rm_models::AssignmentStatus;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn entry(
        id: Id,
        start: NaiveDate,
        end: NaiveDate,
        assignment_status: AssignmentStatus,
        project_status: ProjectStatus,
    ) -> TimelineEntry {
        TimelineEntry {
            assignment: Assignment {
                id: Some(id),
                resource_id: 1,
                project_id: 1,
                role: "Backend Developer".into(),
                start_date: start,
                end_date: end,
                status: assignment_status,
            },
            project_name: "Billing".into(),
            project_status,
        }
    }

    #[test]
    fn test_window_start_is_four_months_back() {
        assert_eq!(window_start(d(2024, 6, 15), 9), d(2024, 2, 1));
        // Year boundary.
        assert_eq!(window_start(d(2024, 2, 10), 9), d(2023, 10, 1));
    }

    #[test]
    fn test_bar_position_inside_window() {
        // Window centered on June 2024 spans Feb..Oct 2024.
        let entries = vec![entry(
            1,
            d(2024, 3, 10),
            d(2024, 5, 20),
            AssignmentStatus::Active,
            ProjectStatus::Ongoing,
        )];
        let bars = project_timeline(&entries, d(2024, 6, 15), 9, 4, d(2024, 4, 1));

        assert_eq!(bars.len(), 1);
        let bar = &bars[0];
        assert_eq!(bar.start_col, 1);
        assert_eq!(bar.end_col, 4);
        assert!((bar.left_fraction - 1.0 / 9.0).abs() < 1e-9);
        assert!((bar.width_fraction - 3.0 / 9.0).abs() < 1e-9);
        assert_eq!(bar.category, BarCategory::Ongoing);
    }

    #[test]
    fn test_bars_clamp_to_window_edges() {
        // Starts well before the window, ends inside it.
        let entries = vec![entry(
            1,
            d(2023, 1, 1),
            d(2024, 3, 31),
            AssignmentStatus::Active,
            ProjectStatus::Ongoing,
        )];
        let bars = project_timeline(&entries, d(2024, 6, 15), 9, 4, d(2024, 4, 1));
        assert_eq!(bars[0].start_col, 0);
        assert_eq!(bars[0].end_col, 2);
    }

    #[test]
    fn test_out_of_window_assignments_are_dropped() {
        let before = entry(
            1,
            d(2022, 1, 1),
            d(2022, 6, 30),
            AssignmentStatus::Released,
            ProjectStatus::Closed,
        );
        let after = entry(
            2,
            d(2026, 1, 1),
            d(2026, 6, 30),
            AssignmentStatus::Active,
            ProjectStatus::Ongoing,
        );
        let bars = project_timeline(&[before, after], d(2024, 6, 15), 9, 4, d(2024, 4, 1));
        assert!(bars.is_empty());
    }

    #[test]
    fn test_row_cap_keeps_most_recent() {
        let entries: Vec<TimelineEntry> = (0..6)
            .map(|i| {
                entry(
                    i as Id + 1,
                    d(2024, 1 + i as u32, 1),
                    d(2024, 1 + i as u32, 28),
                    AssignmentStatus::Active,
                    ProjectStatus::Ongoing,
                )
            })
            .collect();
        let bars = project_timeline(&entries, d(2024, 6, 15), 9, 4, d(2024, 1, 1));
        assert_eq!(bars.len(), 4);
        // Most recent start first.
        assert_eq!(bars[0].assignment_id, Some(6));
        assert_eq!(bars[3].assignment_id, Some(3));
    }

    #[test]
    fn test_categories() {
        let released = entry(
            1,
            d(2024, 3, 1),
            d(2024, 5, 31),
            AssignmentStatus::Released,
            ProjectStatus::Ongoing,
        );
        let past_end = entry(
            2,
            d(2024, 2, 1),
            d(2024, 3, 31),
            AssignmentStatus::Active,
            ProjectStatus::Ongoing,
        );
        let on_hold = entry(
            3,
            d(2024, 4, 1),
            d(2024, 8, 31),
            AssignmentStatus::Active,
            ProjectStatus::Hold,
        );
        let running = entry(
            4,
            d(2024, 4, 1),
            d(2024, 9, 30),
            AssignmentStatus::Active,
            ProjectStatus::Ongoing,
        );

        let today = d(2024, 6, 1);
        let bars = project_timeline(
            &[released, past_end, on_hold, running],
            d(2024, 6, 15),
            9,
            4,
            today,
        );

        let by_id = |id: Id| {
            bars.iter()
                .find(|b| b.assignment_id == Some(id))
                .unwrap()
                .category
        };
        assert_eq!(by_id(1), BarCategory::Closed);
        assert_eq!(by_id(2), BarCategory::Closed);
        assert_eq!(by_id(3), BarCategory::Hold);
        assert_eq!(by_id(4), BarCategory::Ongoing);
    }

    #[test]
    fn test_projection_is_deterministic() {
        let entries = vec![
            entry(
                1,
                d(2024, 3, 10),
                d(2024, 5, 20),
                AssignmentStatus::Active,
                ProjectStatus::Ongoing,
            ),
            entry(
                2,
                d(2024, 1, 1),
                d(2024, 9, 30),
                AssignmentStatus::Active,
                ProjectStatus::Hold,
            ),
        ];
        let first = project_timeline(&entries, d(2024, 6, 15), 9, 4, d(2024, 4, 1));
        let second = project_timeline(&entries, d(2024, 6, 15), 9, 4, d(2024, 4, 1));
        assert_eq!(first, second);
    }
}

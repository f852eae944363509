//! User-data models shared by the persistence, network and sync layers.

use serde::{Deserialize, Serialize};

/// Primary key of a debate.
pub type DebateId = i64;

/// Primary key of a point inside a debate.
pub type PointId = i64;

/// Reading progress of one debate.
///
/// `seen_points` keeps first-seen order and never holds duplicates; a point
/// once seen stays seen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub debate_id: DebateId,
    /// 0..=100, derived from `seen_points` and the debate's point count.
    pub completed_percentage: u8,
    pub seen_points: Vec<PointId>,
}

impl Progress {
    /// Progress of a debate nobody has opened yet.
    pub fn empty(debate_id: DebateId) -> Self {
        Self {
            debate_id,
            completed_percentage: 0,
            seen_points: Vec::new(),
        }
    }

    pub fn has_seen(&self, point_id: PointId) -> bool {
        self.seen_points.contains(&point_id)
    }

    /// Points from `candidates` that are not seen yet, deduplicated, in input order.
    pub fn unseen(&self, candidates: &[PointId]) -> Vec<PointId> {
        let mut fresh: Vec<PointId> = Vec::with_capacity(candidates.len());
        for &point in candidates {
            if !self.has_seen(point) && !fresh.contains(&point) {
                fresh.push(point);
            }
        }
        fresh
    }

    /// Copy with `points` marked seen and the percentage recomputed.
    pub fn with_seen(&self, points: &[PointId], total_points: u32) -> Self {
        let mut seen_points = self.seen_points.clone();
        seen_points.extend(self.unseen(points));
        Self {
            debate_id: self.debate_id,
            completed_percentage: completion_percentage(seen_points.len(), total_points),
            seen_points,
        }
    }
}

/// `round(100 * seen / total)`, clamped to 100. A debate without points is 0% complete.
pub fn completion_percentage(seen: usize, total_points: u32) -> u8 {
    if total_points == 0 {
        return 0;
    }
    let ratio = 100.0 * seen as f64 / f64::from(total_points);
    ratio.round().min(100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentage_rounds_half_up() {
        assert_eq!(completion_percentage(1, 3), 33);
        assert_eq!(completion_percentage(2, 3), 67);
        assert_eq!(completion_percentage(1, 8), 13);
        assert_eq!(completion_percentage(3, 3), 100);
    }

    #[test]
    fn percentage_handles_degenerate_totals() {
        assert_eq!(completion_percentage(0, 0), 0);
        assert_eq!(completion_percentage(5, 0), 0);
        assert_eq!(completion_percentage(7, 4), 100);
    }

    #[test]
    fn unseen_filters_seen_and_duplicates() {
        let progress = Progress {
            debate_id: 1,
            completed_percentage: 20,
            seen_points: vec![10, 11],
        };
        assert_eq!(progress.unseen(&[11, 12, 12, 10, 13]), vec![12, 13]);
        assert!(progress.unseen(&[10, 11, 10]).is_empty());
    }

    #[test]
    fn with_seen_appends_and_recomputes() {
        let progress = Progress::empty(4).with_seen(&[1, 2, 2], 4);
        assert_eq!(progress.seen_points, vec![1, 2]);
        assert_eq!(progress.completed_percentage, 50);

        let progress = progress.with_seen(&[2, 3], 4);
        assert_eq!(progress.seen_points, vec![1, 2, 3]);
        assert_eq!(progress.completed_percentage, 75);
    }
}

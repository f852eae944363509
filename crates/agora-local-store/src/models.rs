//! Database model types.

use agora_config_and_utils::models::{DebateId, PointId, Progress};

/// Row of the `starred` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StarredRecord {
    pub id: i64,
    pub debate_id: DebateId,
}

/// Row of the `progress` table together with its seen points, in first-seen order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressRecord {
    pub id: i64,
    pub debate_id: DebateId,
    pub completed_percentage: u8,
    pub seen_points: Vec<PointId>,
}

impl From<ProgressRecord> for Progress {
    fn from(record: ProgressRecord) -> Self {
        Progress {
            debate_id: record.debate_id,
            completed_percentage: record.completed_percentage,
            seen_points: record.seen_points,
        }
    }
}

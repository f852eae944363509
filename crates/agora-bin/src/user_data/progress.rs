use super::fail;
use crate::app::{AppState, CommandError};
use agora_config_and_utils::models::Progress;

pub fn show_progress(state: &AppState, debate: i64) {
    print_progress(&state.user_data.get_progress(debate));
}

/// Mark `points` seen; one point goes through the single-point path.
pub async fn mark_seen(
    state: &AppState,
    debate: i64,
    points: &[i64],
    total: u32,
) -> Result<(), CommandError> {
    let result = match points {
        [point] => state.user_data.mark_progress(*point, debate, total).await,
        _ => {
            state
                .user_data
                .mark_batch_progress(points, debate, total)
                .await
        }
    };
    result.map_err(|error| fail(state, "seen", error))?;
    print_progress(&state.user_data.get_progress(debate));
    Ok(())
}

fn print_progress(progress: &Progress) {
    let seen: Vec<String> = progress.seen_points.iter().map(i64::to_string).collect();
    println!(
        "Debate {}: {}% ({} points seen{}{})",
        progress.debate_id,
        progress.completed_percentage,
        progress.seen_points.len(),
        if seen.is_empty() { "" } else { ": " },
        seen.join(", ")
    );
}

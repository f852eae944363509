use super::fail;
use crate::app::{AppState, CommandError};

pub async fn set_star(state: &AppState, debate: i64, starred: bool) -> Result<(), CommandError> {
    let command = if starred { "star" } else { "unstar" };
    state
        .user_data
        .star_or_unstar(debate, !starred)
        .await
        .map_err(|error| fail(state, command, error))?;
    println!(
        "Debate {} {}",
        debate,
        if starred { "starred" } else { "unstarred" }
    );
    Ok(())
}

pub fn list_starred(state: &AppState) {
    let starred = state.user_data.starred();
    if starred.is_empty() {
        println!("No starred debates");
        return;
    }
    for debate in starred {
        println!("{}", debate);
    }
}

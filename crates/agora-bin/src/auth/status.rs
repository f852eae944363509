//! `agora status`.

use crate::app::AppState;
use serde_json::json;

pub fn status(state: &AppState, as_json: bool) -> Result<(), serde_json::Error> {
    let session = state.session.status();
    let starred = state.user_data.starred().len();
    let tracked = state.user_data.progress_map().len();
    let load_state = format!("{:?}", state.user_data.load_state());

    if as_json {
        let report = json!({
            "session": session,
            "load_state": load_state,
            "starred": starred,
            "debates_with_progress": tracked,
            "database": state.paths.database_file(),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Session:   {}", session.state);
        println!("Active:    {}", session.is_active);
        println!("Data:      {} (startup: {:?})", load_state, state.initial_load);
        println!("Starred:   {}", starred);
        println!("Progress:  {} debates", tracked);
        println!("Database:  {}", state.paths.database_file().display());
    }
    Ok(())
}

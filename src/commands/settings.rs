use serde::Deserialize;

use crate::models::settings::UserPreferences;

use super::{AppState, CommandError, CommandResult};

pub async fn preferences_get(app_state: &AppState) -> CommandResult<UserPreferences> {
    app_state.settings().preferences().map_err(CommandError::from)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesUpdatePayload {
    #[serde(default)]
    wake_time: Option<String>,
    #[serde(default)]
    sleep_time: Option<String>,
    #[serde(default)]
    focus_duration: Option<u32>,
    #[serde(default)]
    break_duration: Option<u32>,
    #[serde(default)]
    daily_focus_goal: Option<u32>,
}

impl PreferencesUpdatePayload {
    fn apply(self, mut current: UserPreferences) -> UserPreferences {
        if let Some(wake_time) = self.wake_time {
            current.wake_time = wake_time;
        }
        if let Some(sleep_time) = self.sleep_time {
            current.sleep_time = sleep_time;
        }
        if let Some(focus_duration) = self.focus_duration {
            current.focus_duration = focus_duration;
        }
        if let Some(break_duration) = self.break_duration {
            current.break_duration = break_duration;
        }
        if let Some(daily_focus_goal) = self.daily_focus_goal {
            current.daily_focus_goal = daily_focus_goal;
        }
        current
    }
}

pub async fn preferences_update(
    app_state: &AppState,
    payload: PreferencesUpdatePayload,
) -> CommandResult<UserPreferences> {
    let service = app_state.settings();
    let current = service.preferences()?;
    service
        .update_preferences(payload.apply(current))
        .map_err(CommandError::from)
}

pub mod ai_service;
pub mod calendar_service;
pub mod chat_client;
pub mod focus_timer;
pub mod journal_analysis;
pub mod planner_service;
pub mod prompt_templates;
pub mod rate_limiter;
pub mod response_normalizer;
pub mod schedule_utils;
pub mod settings_service;
pub mod task_board;

mod calendar;
mod goal;
mod helpers;
mod profile;
mod stats;
mod transfer;
mod weight;

pub(crate) use calendar::cmd_calendar;
pub(crate) use goal::{cmd_goal_clear, cmd_goal_set, cmd_goal_show};
pub(crate) use helpers::resolve_unit;
pub(crate) use profile::{cmd_profile_set, cmd_profile_show, cmd_profile_unit};
pub(crate) use stats::{cmd_stats, cmd_trend};
pub(crate) use transfer::{cmd_backup, cmd_export, cmd_import, cmd_restore};
pub(crate) use weight::{cmd_delete, cmd_edit, cmd_history, cmd_log};

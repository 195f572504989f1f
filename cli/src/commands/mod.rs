mod goal;
mod helpers;
mod measure;
mod seed;
mod workout;

pub(crate) use goal::{
    GoalChanges, GoalInput, cmd_goal_add, cmd_goal_complete, cmd_goal_delete, cmd_goal_list,
    cmd_goal_update,
};
pub(crate) use helpers::resolve_user;
pub(crate) use measure::{
    cmd_measure_add, cmd_measure_delete, cmd_measure_latest, cmd_measure_list,
};
pub(crate) use seed::cmd_seed;
pub(crate) use workout::{WorkoutInput, cmd_workout_add, cmd_workout_delete, cmd_workout_list};

pub mod workout;

pub use workout::{Exercise, ExercisePatch, NewWorkout, RawSession, Workout, WorkoutPatch};

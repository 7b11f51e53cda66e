pub mod attendance;
pub mod staff;
pub mod task;

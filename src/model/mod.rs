pub mod attendance;
pub mod role;
pub mod staff;
pub mod task;
pub mod user;

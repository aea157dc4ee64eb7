pub mod feedback_controllers;
pub mod health;
pub mod live_controllers;
pub mod poll_controllers;

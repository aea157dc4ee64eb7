pub mod feedback_routes;
pub mod live_routes;
pub mod poll_routes;

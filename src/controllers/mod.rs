pub mod route_controller;
pub mod session_controller;

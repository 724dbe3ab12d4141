pub mod common_dto;
pub mod route_dto;
pub mod session_dto;

pub use common_dto::ApiResponse;

pub mod task_gateway;
pub mod task_service;

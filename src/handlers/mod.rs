pub mod health_handlers;
pub mod inspection_handlers;

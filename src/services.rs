pub mod aforo_service;
pub mod idempotency;
pub mod permisos_service;

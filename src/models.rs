pub mod aforo;
pub mod permisos;
pub mod validation;

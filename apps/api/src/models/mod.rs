pub mod campaign;
pub mod contact;
pub mod spam;
pub mod tracking;

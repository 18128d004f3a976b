pub mod csv;
pub mod field;
pub mod forces;

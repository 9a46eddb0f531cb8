pub mod movie;
pub mod reservation;
pub mod screening;

pub mod notification;
pub mod reservation;
pub mod schedule;
pub mod service;
pub mod user;

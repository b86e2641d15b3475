pub mod availability;
pub mod notification;
pub mod reservation;
pub mod response;
pub mod schedule;
pub mod service;
pub mod user;

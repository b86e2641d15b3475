pub mod auth;
pub mod availability;
pub mod health;
pub mod notification;
pub mod reservation;
pub mod schedule;
pub mod service;

//! API handlers.

pub mod accounts;
pub mod admin;
pub mod advice;
pub mod business;
pub mod health;
pub mod listings;
pub mod passports;
pub mod settings;

pub mod admin;
pub mod auth;
pub mod booking;
pub mod crypto;
pub mod gate;
pub mod inventory;
pub mod log;
pub mod notify;
pub mod user;
pub mod verify;

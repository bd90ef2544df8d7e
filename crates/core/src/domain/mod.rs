pub mod action;
pub mod request;
pub mod user;

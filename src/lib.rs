mod app;
mod auth;
mod config;
mod error;
mod fakes;
mod handlers;
mod mail;
mod models;
mod utils;

pub use app::App;
pub use error::Error;

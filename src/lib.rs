pub mod app;
pub mod config;
pub mod db;
pub mod pages;
pub mod state;
pub mod users;
pub mod views;

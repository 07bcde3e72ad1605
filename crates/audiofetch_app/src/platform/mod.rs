pub mod app;
mod effects;
mod mapping;
mod persistence;
mod ui;

//! Hourglass Overlay Library
//!
//! Desktop sand-timer widget shared between the overlay and settings processes

pub mod animation;
pub mod app;
pub mod config;
pub mod dialog;
pub mod gesture;
pub mod gui;
pub mod hourglass;
pub mod overlay;
pub mod render;
pub mod tray;

//! Core library: download trigger, file locating/renaming and JSON-to-spreadsheet conversion.

pub mod config;
pub mod converter;
pub mod downloader;
pub mod locator;
pub mod models;
pub mod pipeline;
pub mod wait;

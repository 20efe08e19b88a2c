// Neutralizer: bias analysis and neutral rewriting behind a small account system.
//
// This is the library root. Each module corresponds to a major subsystem
// of the service; main.rs wires them together.

pub mod auth;
pub mod bias;
pub mod config;
pub mod db;
pub mod directory;
pub mod download;
pub mod multimodal;
pub mod neutralize;
pub mod output;
pub mod status;
pub mod web;

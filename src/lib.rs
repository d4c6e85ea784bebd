//! Library crate for music-bingo-back, exposing modules for binaries and integration tests.

pub mod bingo;
pub mod config;
pub mod dao;
pub mod dto;
pub mod error;
pub mod playback;
pub mod provider;
pub mod routes;
pub mod services;
pub mod state;

#[cfg(test)]
mod test_support;

//! Pocket table server library.
//!
//! This module exposes the server components for use in tests and binaries.

pub mod body;
pub mod commands;
pub mod config;
pub mod directory;
pub mod game_loop;
pub mod geometry;
pub mod ids;
pub mod outbox;
pub mod physics;
pub mod schedule;
pub mod session;
pub mod table;
pub mod ws;

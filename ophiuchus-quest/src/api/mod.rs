//! HTTP API handlers

pub mod auth;
pub mod health;
pub mod leaderboard;
pub mod quest;
pub mod rooms;
pub mod search;

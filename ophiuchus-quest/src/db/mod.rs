//! Database operations for ophiuchus-quest

pub mod leaderboard;
pub mod profiles;
pub mod sessions;
pub mod tokens;

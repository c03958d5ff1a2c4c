pub mod checkout;
pub mod modes;
pub mod statistics;
pub mod transition;
pub mod validate;

mod config;
mod game_state;
mod message;
mod throw;

pub use config::*;
pub use game_state::*;
pub use message::*;
pub use modes::{GameMode, get_mode};
pub use statistics::{GameRecord, PlayerResult, Statistics, StatsStore, StoreError};
pub use throw::*;
pub use transition::Terminal;
pub use validate::{Rejection, validate_throw};

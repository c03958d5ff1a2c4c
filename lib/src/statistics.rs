//! Statistics aggregator — folds finished games into player and overall stats.
//!
//! The aggregate lives in a `Snapshot` that is rewritten through a
//! `StatsStore` after every change. The store is injected so the aggregator
//! has no file I/O of its own.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// One player's line in a finished game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerResult {
    pub id: String,
    pub name: String,
    pub final_score: u32,
    pub darts: u32,
    /// Three-dart average.
    pub average: f64,
    /// Highest single dart.
    pub best_score: u32,
    /// Lowest accepted dart.
    #[serde(default)]
    pub worst_score: u32,
    /// Accepted darts over darts thrown, 0..=1.
    #[serde(default)]
    pub accuracy: f64,
    #[serde(default)]
    pub double_rate: f64,
    #[serde(default)]
    pub triple_rate: f64,
    pub checkout: bool,
}

/// A finished game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub mode: String,
    pub players: Vec<PlayerResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<u64>,
    pub total_darts: u32,
}

impl GameRecord {
    pub fn new(mode: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp,
            mode: mode.into(),
            players: Vec::new(),
            winner: None,
            duration_secs: None,
            total_darts: 0,
        }
    }

    pub fn player(mut self, result: PlayerResult) -> Self {
        self.total_darts += result.darts;
        self.players.push(result);
        self
    }

    pub fn winner(mut self, id: impl Into<String>) -> Self {
        self.winner = Some(id.into());
        self
    }

    pub fn duration_secs(mut self, secs: u64) -> Self {
        self.duration_secs = Some(secs);
        self
    }
}

/// Running aggregate for one player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerStats {
    pub id: String,
    pub name: String,
    pub games: u32,
    pub wins: u32,
    pub total_darts: u64,
    pub total_score: u64,
    pub best_average: f64,
    pub best_score: u32,
    pub checkouts: u32,
    /// Per-game averages, oldest first.
    #[serde(default)]
    pub averages: Vec<f64>,
    /// Mean of `averages`.
    pub overall_average: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_played: Option<DateTime<Utc>>,
}

impl PlayerStats {
    fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            games: 0,
            wins: 0,
            total_darts: 0,
            total_score: 0,
            best_average: 0.0,
            best_score: 0,
            checkouts: 0,
            averages: Vec::new(),
            overall_average: 0.0,
            last_played: None,
        }
    }

    /// Share of games finished with a checkout, 0..=1.
    pub fn checkout_rate(&self) -> f64 {
        if self.games == 0 {
            0.0
        } else {
            f64::from(self.checkouts) / f64::from(self.games)
        }
    }

    fn fold(&mut self, result: &PlayerResult, game: &GameRecord) {
        // latest name wins
        self.name.clone_from(&result.name);
        self.games += 1;
        if game.winner.as_deref() == Some(result.id.as_str()) {
            self.wins += 1;
        }
        self.total_darts += u64::from(result.darts);
        self.total_score += u64::from(result.final_score);
        if result.checkout {
            self.checkouts += 1;
        }
        self.best_average = self.best_average.max(result.average);
        self.best_score = self.best_score.max(result.best_score);
        self.averages.push(result.average);
        self.overall_average = self.averages.iter().sum::<f64>() / self.averages.len() as f64;
        self.last_played = Some(self.last_played.map_or(game.timestamp, |t| t.max(game.timestamp)));
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverallStats {
    pub total_games: u32,
    pub total_darts: u64,
    pub total_score: u64,
    pub best_average: f64,
    pub best_score: u32,
    /// Share of player results that ended in a checkout, 0..=1.
    pub checkout_rate: f64,
}

/// Everything the store persists. Recomputed before each write.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    pub games: Vec<GameRecord>,
    pub players: BTreeMap<String, PlayerStats>,
    pub overall: OverallStats,
}

impl Snapshot {
    fn recompute_overall(&mut self) {
        let results = self.games.iter().flat_map(|g| g.players.iter());
        let (count, checkouts) = results.fold((0u32, 0u32), |(n, c), r| {
            (n + 1, c + u32::from(r.checkout))
        });

        self.overall = OverallStats {
            total_games: self.games.len() as u32,
            total_darts: self.games.iter().map(|g| u64::from(g.total_darts)).sum(),
            total_score: self
                .games
                .iter()
                .flat_map(|g| g.players.iter())
                .map(|r| u64::from(r.final_score))
                .sum(),
            best_average: self.players.values().map(|p| p.best_average).fold(0.0, f64::max),
            best_score: self.players.values().map(|p| p.best_score).max().unwrap_or(0),
            checkout_rate: if count == 0 {
                0.0
            } else {
                f64::from(checkouts) / f64::from(count)
            },
        };
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModeStats {
    pub mode: String,
    pub games: u32,
    pub total_darts: u64,
    pub total_score: u64,
    pub average_darts_per_game: f64,
    pub average_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyStats {
    pub days: u32,
    pub games: u32,
    pub total_darts: u64,
    pub average_games_per_day: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub most_played_mode: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedPlayer {
    pub rank: usize,
    #[serde(flatten)]
    pub player: PlayerStats,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("statistics store I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("statistics encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),
    #[error("statistics store unavailable: {0}")]
    Unavailable(String),
}

/// Persistence for the statistics snapshot.
pub trait StatsStore {
    /// Load the last saved snapshot, `None` if nothing was saved yet.
    fn load(&self) -> Result<Option<Snapshot>, StoreError>;

    /// Replace the saved snapshot.
    fn save(&self, snapshot: &Snapshot) -> Result<(), StoreError>;
}

/// In-memory store, used by tests and by hosts that do not persist.
#[derive(Debug, Default)]
pub struct MemoryStore {
    saved: Mutex<Option<Snapshot>>,
    fail_saves: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose saves always fail.
    pub fn failing() -> Self {
        Self {
            saved: Mutex::new(None),
            fail_saves: true,
        }
    }

    pub fn saved(&self) -> Option<Snapshot> {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, Option<Snapshot>> {
        self.saved.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl StatsStore for MemoryStore {
    fn load(&self) -> Result<Option<Snapshot>, StoreError> {
        Ok(self.lock().clone())
    }

    fn save(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        if self.fail_saves {
            return Err(StoreError::Unavailable("memory store rejects writes".into()));
        }
        *self.lock() = Some(snapshot.clone());
        Ok(())
    }
}

pub struct Statistics<S: StatsStore> {
    store: S,
    snapshot: Snapshot,
}

impl<S: StatsStore> Statistics<S> {
    /// Load the saved snapshot, or start empty.
    pub fn open(store: S) -> Result<Self, StoreError> {
        let snapshot = store.load()?.unwrap_or_default();
        Ok(Self { store, snapshot })
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Append a finished game and persist. On a failed save the in-memory
    /// aggregate is left as it was before the call.
    pub fn record_game(&mut self, record: GameRecord) -> Result<&GameRecord, StoreError> {
        let mut next = self.snapshot.clone();
        for result in &record.players {
            next.players
                .entry(result.id.clone())
                .or_insert_with(|| PlayerStats::new(&result.id, &result.name))
                .fold(result, &record);
        }
        let index = next.games.len();
        next.games.push(record);
        next.recompute_overall();

        self.store.save(&next)?;
        self.snapshot = next;
        Ok(&self.snapshot.games[index])
    }

    /// Drop every game and player and persist the empty snapshot.
    pub fn clear(&mut self) -> Result<(), StoreError> {
        let empty = Snapshot::default();
        self.store.save(&empty)?;
        self.snapshot = empty;
        Ok(())
    }

    pub fn player(&self, id: &str) -> Option<&PlayerStats> {
        self.snapshot.players.get(id)
    }

    pub fn all_players(&self) -> impl Iterator<Item = &PlayerStats> {
        self.snapshot.players.values()
    }

    /// Players by overall average, best first.
    pub fn top_players(&self, limit: usize) -> Vec<&PlayerStats> {
        let mut players: Vec<&PlayerStats> = self.all_players().collect();
        players.sort_by(|a, b| b.overall_average.total_cmp(&a.overall_average));
        players.truncate(limit);
        players
    }

    pub fn player_ranking(&self) -> Vec<RankedPlayer> {
        self.top_players(usize::MAX)
            .into_iter()
            .enumerate()
            .map(|(i, player)| RankedPlayer {
                rank: i + 1,
                player: player.clone(),
            })
            .collect()
    }

    pub fn mode_stats(&self, mode: &str) -> Option<ModeStats> {
        let games: Vec<&GameRecord> = self
            .snapshot
            .games
            .iter()
            .filter(|g| g.mode == mode)
            .collect();
        if games.is_empty() {
            return None;
        }
        let count = games.len() as u32;
        let total_darts: u64 = games.iter().map(|g| u64::from(g.total_darts)).sum();
        let total_score: u64 = games
            .iter()
            .flat_map(|g| g.players.iter())
            .map(|r| u64::from(r.final_score))
            .sum();
        Some(ModeStats {
            mode: mode.to_string(),
            games: count,
            total_darts,
            total_score,
            average_darts_per_game: total_darts as f64 / f64::from(count),
            average_score: total_score as f64 / f64::from(count),
        })
    }

    /// Activity over the `days` days before `now`. A window reaching past the
    /// earliest representable date covers every game.
    pub fn daily_stats(&self, days: u32, now: DateTime<Utc>) -> DailyStats {
        let cutoff = Duration::try_days(i64::from(days))
            .and_then(|window| now.checked_sub_signed(window))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let recent: Vec<&GameRecord> = self
            .snapshot
            .games
            .iter()
            .filter(|g| g.timestamp >= cutoff)
            .collect();
        DailyStats {
            days,
            games: recent.len() as u32,
            total_darts: recent.iter().map(|g| u64::from(g.total_darts)).sum(),
            average_games_per_day: if days == 0 {
                0.0
            } else {
                recent.len() as f64 / f64::from(days)
            },
            most_played_mode: most_played(recent.iter().copied()),
        }
    }

    /// Newest games first.
    pub fn recent_games(&self, limit: usize) -> Vec<&GameRecord> {
        let mut games: Vec<&GameRecord> = self.snapshot.games.iter().collect();
        games.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        games.truncate(limit);
        games
    }

    pub fn mode_distribution(&self) -> BTreeMap<String, usize> {
        let mut distribution = BTreeMap::new();
        for game in &self.snapshot.games {
            *distribution.entry(game.mode.clone()).or_insert(0) += 1;
        }
        distribution
    }

    /// Ties go to the mode played first.
    pub fn most_played_mode(&self) -> Option<String> {
        most_played(self.snapshot.games.iter())
    }

    pub fn overall(&self) -> &OverallStats {
        &self.snapshot.overall
    }

    /// One row per player result.
    pub fn export_csv(&self) -> String {
        let mut out = String::from(concat!(
            "game_id,timestamp,mode,player,final_score,",
            "darts,average,best_score,checkout,accuracy\n",
        ));
        for game in &self.snapshot.games {
            for r in &game.players {
                out.push_str(&format!(
                    "{},{},{},{},{},{},{:.2},{},{},{:.2}\n",
                    game.id,
                    game.timestamp.to_rfc3339(),
                    game.mode,
                    csv_field(&r.name),
                    r.final_score,
                    r.darts,
                    r.average,
                    r.best_score,
                    u8::from(r.checkout),
                    r.accuracy,
                ));
            }
        }
        out
    }
}

fn most_played<'a>(games: impl Iterator<Item = &'a GameRecord>) -> Option<String> {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for game in games {
        match counts.iter_mut().find(|(mode, _)| *mode == game.mode) {
            Some((_, n)) => *n += 1,
            None => counts.push((game.mode.as_str(), 1)),
        }
    }
    // max_by_key keeps the last maximum; scan in reverse so the first wins
    counts
        .into_iter()
        .rev()
        .max_by_key(|(_, n)| *n)
        .map(|(mode, _)| mode.to_string())
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

//! Rules Engine
//!
//! Score, match clock, rune spawning and the win/draw decision for one room.
//! Deaths are observed through the `died` edge event, which each avatar
//! raises exactly once per life.

use serde::{Serialize, Deserialize};
use tracing::{debug, info};

use crate::core::rng::DeterministicRng;
use crate::game::entity::{DeathCause, Entity, EntityId, EntityKind, Team};
use crate::game::events::EdgeEvent;
use crate::game::lifecycle::EntityManager;
use crate::game::map::ArenaMap;
use crate::game::rune::{random_rune_type, Rune};

/// Match tunables.
#[derive(Clone, Debug, PartialEq)]
pub struct RulesConfig {
    /// Round length in seconds
    pub round_time: f32,
    /// Kills needed to win outright
    pub score_cap: u32,
    /// Seconds between rune spawns
    pub rune_interval: f32,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            round_time: 300.0,
            score_cap: 15,
            rune_interval: 120.0,
        }
    }
}

/// Phase of the match.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatchPhase {
    /// Waiting for both teams to field an avatar
    Waiting,
    /// Clock running, kills score
    Playing,
    /// Decided; nothing scores any more
    Ended(Outcome),
}

/// How a match ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// One team won
    Winner(Team),
    /// Equal scores at the final whistle
    Draw,
}

impl Outcome {
    /// Display label sent to clients.
    pub fn label(self) -> &'static str {
        match self {
            Outcome::Winner(team) => team.label(),
            Outcome::Draw => "Draw",
        }
    }
}

/// Per-room rules state.
#[derive(Clone, Debug)]
pub struct RulesEngine {
    config: RulesConfig,
    phase: MatchPhase,
    red_score: u32,
    blue_score: u32,
    clock: f32,
    rune_timer: f32,
}

impl RulesEngine {
    /// Engine waiting for players.
    pub fn new(config: RulesConfig) -> Self {
        Self {
            phase: MatchPhase::Waiting,
            red_score: 0,
            blue_score: 0,
            clock: config.round_time,
            rune_timer: config.rune_interval,
            config,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    /// Score of a team.
    pub fn score(&self, team: Team) -> u32 {
        match team {
            Team::Red => self.red_score,
            Team::Blue => self.blue_score,
        }
    }

    /// Seconds left on the clock.
    pub fn time_remaining(&self) -> f32 {
        self.clock
    }

    /// Has the match been decided?
    pub fn is_over(&self) -> bool {
        matches!(self.phase, MatchPhase::Ended(_))
    }

    /// Outcome, once decided.
    pub fn outcome(&self) -> Option<Outcome> {
        match self.phase {
            MatchPhase::Ended(outcome) => Some(outcome),
            _ => None,
        }
    }

    /// Start the match: scores zeroed, full clock, fresh rune timer.
    pub fn start(&mut self) {
        self.phase = MatchPhase::Playing;
        self.red_score = 0;
        self.blue_score = 0;
        self.clock = self.config.round_time;
        self.rune_timer = self.config.rune_interval;
        info!(round_time = self.clock, score_cap = self.config.score_cap, "match started");
    }

    /// Start once both teams field an avatar.
    pub fn check_start(&mut self, manager: &EntityManager) {
        if self.phase != MatchPhase::Waiting {
            return;
        }
        let fielded = |team: Team| {
            manager
                .iter_all()
                .any(|e| e.as_avatar().is_some_and(|a| a.team == team))
        };
        if fielded(Team::Red) && fielded(Team::Blue) {
            self.start();
        }
    }

    /// One rules tick, run after the lifecycle tick.
    pub fn tick(&mut self, dt: f32, manager: &mut EntityManager, map: &ArenaMap, rng: &mut DeterministicRng) {
        self.check_start(manager);
        if self.phase != MatchPhase::Playing {
            return;
        }

        self.resolve_deaths(manager);
        if self.is_over() {
            return;
        }

        self.rune_timer -= dt;
        if self.rune_timer <= 0.0 {
            self.rune_timer = self.config.rune_interval;
            self.spawn_rune(manager, map, rng);
        }

        self.clock = (self.clock - dt).max(0.0);
        if self.clock <= 0.0 {
            let outcome = match self.red_score.cmp(&self.blue_score) {
                std::cmp::Ordering::Greater => Outcome::Winner(Team::Red),
                std::cmp::Ordering::Less => Outcome::Winner(Team::Blue),
                std::cmp::Ordering::Equal => Outcome::Draw,
            };
            self.end(outcome);
        }
    }

    fn resolve_deaths(&mut self, manager: &mut EntityManager) {
        let deaths: Vec<(EntityId, DeathCause)> = manager
            .iter()
            .filter(|e| e.events.contains(EdgeEvent::Died))
            .filter_map(|e| Some((e.id, e.as_avatar()?.death_cause?)))
            .collect();

        for (victim, cause) in deaths {
            if self.is_over() {
                break;
            }
            match cause {
                DeathCause::Killed { killer, team } => {
                    let score = match team {
                        Team::Red => &mut self.red_score,
                        Team::Blue => &mut self.blue_score,
                    };
                    *score += 1;
                    let score = *score;
                    info!(victim, killer, team = team.label(), score, "kill");

                    if let Some(Entity { kind: EntityKind::Avatar(avatar), events, .. }) = manager.get_mut(killer) {
                        avatar.award_kill(events);
                    }

                    if score >= self.config.score_cap {
                        self.end(Outcome::Winner(team));
                    }
                }
                other => debug!(victim, cause = ?other, "death without score"),
            }
        }
    }

    fn spawn_rune(&mut self, manager: &mut EntityManager, map: &ArenaMap, rng: &mut DeterministicRng) {
        let Some(&at) = rng.choose(map.rune_landmarks()) else {
            return;
        };
        let rune_type = random_rune_type(rng);
        let id = manager.enqueue_add(at, EntityKind::Rune(Rune::new(rune_type)));
        debug!(rune = id, ?rune_type, x = at.x, y = at.y, "rune spawned");
    }

    fn end(&mut self, outcome: Outcome) {
        self.phase = MatchPhase::Ended(outcome);
        info!(
            red = self.red_score,
            blue = self.blue_score,
            winner = outcome.label(),
            "match over"
        );
    }

    /// Client view.
    pub fn summary(&self) -> RulesSummary {
        RulesSummary {
            red_score: self.red_score,
            blue_score: self.blue_score,
            score_cap: self.config.score_cap,
            time_remaining: self.clock,
            is_playing: self.phase == MatchPhase::Playing,
            is_game_over: self.is_over(),
            winner: self.outcome().map(|o| o.label().to_string()),
        }
    }
}

/// Rules state as shown to clients.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RulesSummary {
    /// Red kills
    pub red_score: u32,
    /// Blue kills
    pub blue_score: u32,
    /// Kills needed to win
    pub score_cap: u32,
    /// Seconds left
    pub time_remaining: f32,
    /// Clock running
    pub is_playing: bool,
    /// Decided
    pub is_game_over: bool,
    /// "Red Team", "Blue Team" or "Draw" once decided
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner: Option<String>,
}

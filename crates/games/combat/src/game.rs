use crate::config::ROOMS;
use crate::systems;
use crate::world::{CombatState, Position};
use airlock_core::{Conflict, Millis, PlayerSlot, Timestamp};
use airlock_puzzle::normalize;
use airlock_types::{ClueResult, CombatPhase, SessionEvent, ShotResult, StatusEffect};

impl CombatState {
    /// Enter the first room. Only has an effect while waiting.
    pub fn start(&mut self, now: Timestamp, events: &mut Vec<SessionEvent>) {
        if self.phase != CombatPhase::Waiting {
            return;
        }
        self.phase = CombatPhase::RoomClearing;
        self.last_tick_at = Some(now);
        self.room_index = 0;
        systems::spawn_room(self, now, events);
    }

    /// Bring the simulation up to `now`.
    ///
    /// Pure function of the stored timestamps: calling it twice with the same
    /// `now` is a no-op, and paused or finished runs only move the clock.
    pub fn advance(&mut self, now: Timestamp, events: &mut Vec<SessionEvent>) {
        let Some(last) = self.last_tick_at else {
            self.last_tick_at = Some(now);
            return;
        };
        if now <= last {
            return;
        }
        self.last_tick_at = Some(now);
        if self.paused || self.phase != CombatPhase::RoomClearing {
            return;
        }

        let dt = now.saturating_since(last);
        systems::drain_oxygen(self, dt);
        systems::finish_reloads(self, now);
        systems::update_monsters(self, dt);
        systems::evaluate(self, now, events);
    }

    fn ensure_playable(&self) -> Result<(), Conflict> {
        match self.phase {
            CombatPhase::Waiting => Err(Conflict::NotStarted),
            CombatPhase::Victory | CombatPhase::Defeat => Err(Conflict::GameCompleted),
            CombatPhase::RoomClearing if self.paused => Err(Conflict::Paused),
            CombatPhase::RoomClearing => Ok(()),
        }
    }

    fn ensure_not_finished(&self) -> Result<(), Conflict> {
        if self.phase.is_terminal() {
            Err(Conflict::GameCompleted)
        } else {
            Ok(())
        }
    }

    pub fn move_to(&mut self, slot: PlayerSlot, x: f32, y: f32) -> Result<(), Conflict> {
        self.ensure_playable()?;
        let target = Position::new(x, y).clamped(self.config.arena_width, self.config.arena_height);
        self.fighter_mut(slot).position = target;
        Ok(())
    }

    /// Start a reload. A full magazine is left alone.
    pub fn reload(&mut self, slot: PlayerSlot, now: Timestamp) -> Result<(), Conflict> {
        self.ensure_playable()?;
        let magazine = self.config.magazine_size;
        let reload_time = self.config.reload_time;
        let fighter = self.fighter_mut(slot);
        if fighter.is_reloading(now) {
            return Err(Conflict::Reloading);
        }
        if fighter.ammo < magazine {
            fighter.reload_until = Some(now.plus(reload_time));
        }
        Ok(())
    }

    /// Fire at `(x, y)`. Hits the nearest monster whose hitbox contains the point.
    pub fn shoot(
        &mut self,
        slot: PlayerSlot,
        x: f32,
        y: f32,
        now: Timestamp,
        events: &mut Vec<SessionEvent>,
    ) -> Result<ShotResult, Conflict> {
        self.ensure_playable()?;
        systems::finish_reloads(self, now);

        let fighter = self.fighter_mut(slot);
        if fighter.is_reloading(now) {
            return Err(Conflict::Reloading);
        }
        if fighter.ammo == 0 {
            return Err(Conflict::NoAmmo);
        }
        fighter.ammo -= 1;
        fighter.total_shots += 1;
        let ammo_left = fighter.ammo;
        if let Some(stats) = self.current_stats_mut() {
            stats.shots += 1;
        }

        let target = Position::new(x, y);
        let hit = self
            .monsters
            .iter()
            .filter(|(_, m)| m.contains(target))
            .min_by(|a, b| {
                let da = a.1.position.distance(target);
                let db = b.1.position.distance(target);
                da.total_cmp(&db)
            })
            .map(|(id, _)| id);

        let Some(id) = hit else {
            return Ok(ShotResult {
                hit: false,
                damage: 0,
                killed: false,
                ammo_left,
            });
        };

        let weapon = self.config.weapon_damage;
        let monster = &mut self.monsters[id];
        let raw = if monster.has(StatusEffect::Shielded) {
            (weapon / 2).max(1)
        } else {
            weapon
        };
        let dealt = raw.min(monster.health);
        monster.health -= dealt;
        let killed = monster.health == 0;
        let (tier, is_boss) = (monster.tier, monster.is_boss);
        let phase_change = if killed {
            None
        } else {
            systems::update_boss_phase(monster)
        };

        let fighter = self.fighter_mut(slot);
        fighter.successful_shots += 1;
        fighter.damage_dealt += dealt as u64;

        if let Some(phase) = phase_change {
            tracing::debug!(phase, "boss phase changed");
            events.push(SessionEvent::BossPhaseChanged { phase });
        }
        if killed {
            self.monsters.remove(id);
            self.fighter_mut(slot).kills += 1;
            self.total_kills += 1;
            if let Some(stats) = self.current_stats_mut() {
                stats.kills += 1;
            }
            events.push(SessionEvent::MonsterKilled {
                slot,
                tier,
                is_boss,
            });
            systems::evaluate(self, now, events);
        }

        Ok(ShotResult {
            hit: true,
            damage: dealt,
            killed,
            ammo_left,
        })
    }

    /// Answer the current room's clue gate.
    ///
    /// Wrong answers draw from the room's shared pool. Once it is empty every
    /// submission reports `correct = false` without changing anything.
    pub fn submit_clue(
        &mut self,
        answer: &str,
        now: Timestamp,
        events: &mut Vec<SessionEvent>,
    ) -> Result<ClueResult, Conflict> {
        self.ensure_playable()?;
        let room_index = self.room_index;
        let clue = self.clue.as_mut().ok_or(Conflict::NoClue)?;
        if clue.solved {
            return Err(Conflict::ClueAlreadySolved);
        }
        if clue.exhausted() {
            return Ok(ClueResult {
                correct: false,
                attempts_used: clue.attempts,
                max_attempts: clue.max_attempts,
                exhausted: true,
                solved: false,
            });
        }

        let submitted = normalize(answer);
        let correct = !submitted.is_empty() && submitted == normalize(&clue.answer);
        if correct {
            clue.solved = true;
        } else {
            clue.attempts += 1;
        }
        let result = ClueResult {
            correct,
            attempts_used: clue.attempts,
            max_attempts: clue.max_attempts,
            exhausted: clue.exhausted(),
            solved: clue.solved,
        };

        if correct {
            events.push(SessionEvent::ClueSolved { room_index });
            systems::evaluate(self, now, events);
        }
        Ok(result)
    }

    pub fn pause(&mut self, events: &mut Vec<SessionEvent>) -> Result<(), Conflict> {
        self.ensure_not_finished()?;
        if !self.paused {
            self.paused = true;
            events.push(SessionEvent::Paused);
        }
        Ok(())
    }

    pub fn resume(&mut self, events: &mut Vec<SessionEvent>) -> Result<(), Conflict> {
        self.ensure_not_finished()?;
        if self.paused {
            self.paused = false;
            events.push(SessionEvent::Resumed);
        }
        Ok(())
    }

    pub fn force_outcome(
        &mut self,
        outcome: CombatPhase,
        events: &mut Vec<SessionEvent>,
    ) -> Result<(), Conflict> {
        self.ensure_not_finished()?;
        systems::set_outcome(self, outcome, events);
        Ok(())
    }

    /// Add (positive) or remove (negative) oxygen. Running out is a defeat.
    pub fn adjust_oxygen(
        &mut self,
        delta_ms: i64,
        events: &mut Vec<SessionEvent>,
    ) -> Result<(), Conflict> {
        self.ensure_not_finished()?;
        let magnitude = Millis::from_millis(delta_ms.unsigned_abs());
        self.oxygen_remaining = if delta_ms >= 0 {
            self.oxygen_remaining.saturating_add(magnitude)
        } else {
            self.oxygen_remaining.saturating_sub(magnitude)
        };
        events.push(SessionEvent::OxygenAdjusted { delta_ms });
        if self.oxygen_remaining.is_zero() {
            systems::set_outcome(self, CombatPhase::Defeat, events);
        }
        Ok(())
    }

    /// Move straight to the next room, leaving the current one uncleared.
    pub fn skip_room(
        &mut self,
        now: Timestamp,
        events: &mut Vec<SessionEvent>,
    ) -> Result<(), Conflict> {
        self.ensure_not_finished()?;
        if self.phase == CombatPhase::Waiting {
            return Err(Conflict::NotStarted);
        }
        if self.room_index + 1 >= ROOMS.len() {
            return Err(Conflict::FinalRoom);
        }
        events.push(SessionEvent::RoomSkipped {
            room_index: self.room_index,
        });
        self.room_index += 1;
        systems::spawn_room(self, now, events);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CombatConfig;
    use airlock_types::Difficulty;

    fn at(ms: u64) -> Timestamp {
        Timestamp::from_millis(ms)
    }

    fn started() -> (CombatState, Vec<SessionEvent>) {
        let mut state = CombatState::new(
            Difficulty::Normal,
            1234,
            Millis::from_mins(45),
            CombatConfig::default(),
        );
        state.fighter_mut(0);
        let mut events = Vec::new();
        state.start(at(0), &mut events);
        (state, events)
    }

    /// Shoot the current room's monsters dead from slot 0, reloading as needed.
    fn clear_room(state: &mut CombatState, now: &mut u64, events: &mut Vec<SessionEvent>) {
        let room = state.room_index;
        while state.room_index == room {
            let Some(m) = state.monsters.values().next() else {
                break;
            };
            let (x, y) = (m.position.x, m.position.y);
            match state.shoot(0, x, y, at(*now), events) {
                Ok(_) => {}
                Err(Conflict::NoAmmo) => {
                    state.reload(0, at(*now)).unwrap();
                    *now += 1_500;
                }
                Err(other) => panic!("unexpected conflict {other:?}"),
            }
        }
    }

    #[test]
    fn killing_the_third_monster_advances_exactly_one_room() {
        let (mut state, mut events) = started();
        assert_eq!(state.monsters.len(), 3);
        assert_eq!(state.room_index, 0);

        let mut now = 0;
        clear_room(&mut state, &mut now, &mut events);

        assert_eq!(state.room_index, 1);
        assert_eq!(state.phase, CombatPhase::RoomClearing);
        assert_eq!(state.total_kills, 3);
        assert_eq!(state.room_stats.len(), 2);
        assert_eq!(state.room_stats[0].kills, 3);
        assert!(state.room_stats[0].cleared_at.is_some());
        assert_eq!(state.monsters.len(), 4);
        assert!(events.contains(&SessionEvent::RoomCleared { room_index: 0 }));
    }

    #[test]
    fn clue_gate_holds_the_room_until_solved() {
        let (mut state, mut events) = started();
        let mut now = 0;
        clear_room(&mut state, &mut now, &mut events);
        clear_room(&mut state, &mut now, &mut events);

        // Cargo Hold is gated by a morse clue
        assert_eq!(state.room_index, 1);
        assert!(state.monsters.is_empty());

        let wrong = state.submit_clue("door", at(now), &mut events).unwrap();
        assert!(!wrong.correct);
        assert_eq!(wrong.attempts_used, 1);

        let right = state.submit_clue(" vent ", at(now), &mut events).unwrap();
        assert!(right.correct && right.solved);
        assert_eq!(state.room_index, 2);
        assert!(events.contains(&SessionEvent::ClueSolved { room_index: 1 }));
    }

    #[test]
    fn exhausted_clue_is_idempotent() {
        let (mut state, mut events) = started();
        state.skip_room(at(0), &mut events).unwrap();

        for _ in 0..3 {
            state.submit_clue("wrong", at(0), &mut events).unwrap();
        }
        let before = state.clue.clone().map(|c| (c.attempts, c.solved));
        for _ in 0..5 {
            let result = state.submit_clue("VENT", at(0), &mut events).unwrap();
            assert!(!result.correct);
            assert!(result.exhausted);
            assert_eq!(result.attempts_used, 3);
        }
        assert_eq!(state.clue.map(|c| (c.attempts, c.solved)), before);
    }

    #[test]
    fn clearing_the_final_room_is_victory() {
        let (mut state, mut events) = started();
        for _ in 0..4 {
            state.skip_room(at(0), &mut events).unwrap();
        }
        assert_eq!(state.skip_room(at(0), &mut events), Err(Conflict::FinalRoom));

        let mut now = 0;
        clear_room(&mut state, &mut now, &mut events);
        assert_eq!(state.phase, CombatPhase::RoomClearing);
        state.submit_clue("override", at(now), &mut events).unwrap();

        assert_eq!(state.phase, CombatPhase::Victory);
        assert_eq!(
            state.shoot(0, 1.0, 1.0, at(now), &mut events),
            Err(Conflict::GameCompleted)
        );
    }

    #[test]
    fn boss_phases_are_announced_and_shield_halves_damage() {
        let (mut state, mut events) = started();
        for _ in 0..4 {
            state.skip_room(at(0), &mut events).unwrap();
        }
        state.monsters.retain(|_, m| m.is_boss);
        let (id, target) = {
            let (id, boss) = state.monsters.iter().next().unwrap();
            (id, boss.position)
        };
        state.monsters[id].max_health = 400;
        state.monsters[id].health = 200;
        events.clear();

        let weapon = state.config.weapon_damage;
        let first = state.shoot(0, target.x, target.y, at(0), &mut events).unwrap();
        assert_eq!(first.damage, weapon);
        assert_eq!(state.monsters[id].boss_phase, 2);
        assert!(events.contains(&SessionEvent::BossPhaseChanged { phase: 2 }));

        state.monsters[id].health = 100;
        let second = state.shoot(0, target.x, target.y, at(0), &mut events).unwrap();
        assert_eq!(second.damage, weapon);
        assert!(state.monsters[id].has(StatusEffect::Shielded));
        assert!(events.contains(&SessionEvent::BossPhaseChanged { phase: 3 }));

        let shielded = state.shoot(0, target.x, target.y, at(0), &mut events).unwrap();
        assert!(shielded.hit && !shielded.killed);
        assert_eq!(shielded.damage, weapon / 2);
        assert_eq!(state.monsters[id].health, 100 - weapon - weapon / 2);
        let announced = events
            .iter()
            .filter(|e| matches!(e, SessionEvent::BossPhaseChanged { .. }))
            .count();
        assert_eq!(announced, 2);
    }

    #[test]
    fn oxygen_running_out_is_defeat() {
        let mut state = CombatState::new(
            Difficulty::Normal,
            9,
            Millis::from_secs(5),
            CombatConfig::default(),
        );
        state.fighter_mut(0);
        let mut events = Vec::new();
        state.start(at(0), &mut events);

        state.advance(at(6_000), &mut events);
        assert_eq!(state.phase, CombatPhase::Defeat);
        assert!(state.oxygen_remaining.is_zero());
        assert!(events.contains(&SessionEvent::Defeat));

        let victory = state.force_outcome(CombatPhase::Victory, &mut events);
        assert_eq!(victory, Err(Conflict::GameCompleted));
    }

    #[test]
    fn advance_is_idempotent_for_the_same_instant() {
        let (mut state, mut events) = started();
        state.advance(at(1_000), &mut events);
        let oxygen = state.oxygen_remaining;
        let positions: Vec<_> = state.monsters.values().map(|m| m.position).collect();

        state.advance(at(1_000), &mut events);
        assert_eq!(state.oxygen_remaining, oxygen);
        let again: Vec<_> = state.monsters.values().map(|m| m.position).collect();
        assert_eq!(positions, again);
        assert_eq!(oxygen, Millis::from_mins(45).saturating_sub(Millis::from_secs(1)));
    }

    #[test]
    fn paused_runs_do_not_lose_oxygen() {
        let (mut state, mut events) = started();
        state.pause(&mut events).unwrap();
        state.advance(at(60_000), &mut events);
        assert_eq!(state.oxygen_remaining, Millis::from_mins(45));
        assert_eq!(state.shoot(0, 1.0, 1.0, at(60_000), &mut events), Err(Conflict::Paused));

        state.resume(&mut events).unwrap();
        state.advance(at(61_000), &mut events);
        assert_eq!(
            state.oxygen_remaining,
            Millis::from_mins(45).saturating_sub(Millis::from_secs(1))
        );
    }

    #[test]
    fn empty_magazine_and_reload_refuse_without_counting() {
        let (mut state, mut events) = started();
        state.fighter_mut(0).ammo = 0;

        assert_eq!(state.shoot(0, 1.0, 1.0, at(0), &mut events), Err(Conflict::NoAmmo));
        state.reload(0, at(0)).unwrap();
        assert_eq!(state.shoot(0, 1.0, 1.0, at(100), &mut events), Err(Conflict::Reloading));
        assert_eq!(state.fighters[0].total_shots, 0);

        let miss = state.shoot(0, 1.0, 1.0, at(1_500), &mut events).unwrap();
        assert!(!miss.hit);
        assert_eq!(miss.ammo_left, 11);
        assert_eq!(state.fighters[0].total_shots, 1);
        assert_eq!(state.fighters[0].accuracy(), 0.0);
    }

    #[test]
    fn actions_before_start_are_refused() {
        let mut state = CombatState::new(
            Difficulty::Easy,
            1,
            Millis::from_mins(10),
            CombatConfig::default(),
        );
        let mut events = Vec::new();
        assert_eq!(state.move_to(0, 5.0, 5.0), Err(Conflict::NotStarted));
        assert_eq!(state.skip_room(at(0), &mut events), Err(Conflict::NotStarted));
    }

    #[test]
    fn moves_are_clamped_to_the_arena() {
        let (mut state, _) = started();
        state.move_to(0, -20.0, 250.0).unwrap();
        assert_eq!(state.fighters[0].position, Position::new(0.0, 100.0));
    }

    #[test]
    fn oxygen_adjustment_can_defeat() {
        let (mut state, mut events) = started();
        state.adjust_oxygen(30, &mut events).unwrap();
        assert_eq!(
            state.oxygen_remaining,
            Millis::from_mins(45).saturating_add(Millis::from_millis(30))
        );
        state.adjust_oxygen(-10_000_000, &mut events).unwrap();
        assert_eq!(state.phase, CombatPhase::Defeat);
    }
}

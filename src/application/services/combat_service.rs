//! Combat Service - owner of the shared encounter
//!
//! There is exactly one live [`CombatState`]. Every command takes the write
//! lock, runs the domain operation and, when something changed, bumps the
//! version, stamps `lastUpdated` and publishes the new snapshot on a watch
//! channel. Viewers and the persistence worker subscribe to that channel.

use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tokio::sync::{watch, RwLock};
use tracing::{debug, info, instrument, warn};

use crate::application::dto::{ActionReportDto, AttackRequestDto};
use crate::application::ports::outbound::{ClockPort, HistoryRecordPort, RandomPort};
use crate::domain::aggregates::CombatState;
use crate::domain::entities::{CombatHistory, CombatLogEntry, CombatantPatch, NewCombatant};
use crate::domain::services::{
    resolve_afflict, resolve_attack, resolve_heal, resolve_remove_condition, resolve_save,
    resolve_set_hp, resolve_set_temp_hp, resolve_temp_hp, Resolution, SaveAction, SupportAction,
};
use crate::domain::value_objects::{CombatantId, HistoryId};

pub struct CombatService {
    state: RwLock<CombatState>,
    changes: watch::Sender<Arc<CombatState>>,
    clock: Arc<dyn ClockPort>,
    random: Arc<dyn RandomPort>,
    /// Off-site copy of archived encounters
    history_backup: Option<Arc<dyn HistoryRecordPort>>,
}

impl CombatService {
    pub fn new(
        initial: CombatState,
        clock: Arc<dyn ClockPort>,
        random: Arc<dyn RandomPort>,
        history_backup: Option<Arc<dyn HistoryRecordPort>>,
    ) -> Self {
        let (changes, _) = watch::channel(Arc::new(initial.clone()));
        Self {
            state: RwLock::new(initial),
            changes,
            clock,
            random,
            history_backup,
        }
    }

    /// Receive every published snapshot. The current one is marked seen.
    pub fn subscribe(&self) -> watch::Receiver<Arc<CombatState>> {
        let mut receiver = self.changes.subscribe();
        receiver.mark_unchanged();
        receiver
    }

    pub async fn snapshot(&self) -> CombatState {
        self.state.read().await.clone()
    }

    fn commit(&self, state: &mut CombatState, now: DateTime<Utc>) {
        state.touch(now);
        self.changes.send_replace(Arc::new(state.clone()));
        debug!(version = state.version, "Combat state updated");
    }

    // ========================================================================
    // Combatant store
    // ========================================================================

    #[instrument(skip(self, fields), fields(name = %fields.name))]
    pub async fn add_combatant(&self, fields: NewCombatant) -> Result<CombatantId> {
        let now = self.clock.now();
        let mut state = self.state.write().await;
        let id = state.add_combatant(fields, now)?;
        self.commit(&mut state, now);
        info!(combatant_id = %id, "Added combatant");
        Ok(id)
    }

    #[instrument(skip(self, patch))]
    pub async fn update_combatant(&self, id: CombatantId, patch: CombatantPatch) -> bool {
        let now = self.clock.now();
        let mut state = self.state.write().await;
        let updated = state.update_combatant(id, patch);
        if updated {
            self.commit(&mut state, now);
        }
        updated
    }

    #[instrument(skip(self))]
    pub async fn remove_combatant(&self, id: CombatantId) -> bool {
        let now = self.clock.now();
        let mut state = self.state.write().await;
        let removed = state.remove_combatant(id);
        if removed {
            self.commit(&mut state, now);
            info!(combatant_id = %id, "Removed combatant");
        }
        removed
    }

    // ========================================================================
    // Turn/round scheduler
    // ========================================================================

    #[instrument(skip(self))]
    pub async fn start_combat(&self) -> Result<()> {
        let now = self.clock.now();
        let mut state = self.state.write().await;
        state.start_combat()?;
        self.commit(&mut state, now);
        info!(combatants = state.combatants.len(), "Combat started");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn next_turn(&self) -> bool {
        let now = self.clock.now();
        let mut state = self.state.write().await;
        let advanced = state.advance_turn(now);
        if advanced {
            self.commit(&mut state, now);
            debug!(round = state.round, turn = state.current_turn, "Turn advanced");
        }
        advanced
    }

    // ========================================================================
    // Actions
    // ========================================================================

    #[instrument(skip(self, request), fields(targets = request.target_ids.len()))]
    pub async fn attack(&self, request: AttackRequestDto) -> ActionReportDto {
        let roll = request.roll.unwrap_or_else(|| self.random.roll_d20());
        let action = request.into_action(roll);
        let mut report = self.resolve(|state| resolve_attack(state, &action)).await;
        report.roll = Some(roll);
        report
    }

    #[instrument(skip(self, action), fields(targets = action.target_ids.len(), ability = %action.ability))]
    pub async fn saving_throw(&self, action: SaveAction) -> ActionReportDto {
        self.resolve(|state| resolve_save(state, &action)).await
    }

    #[instrument(skip(self, action), fields(targets = action.target_ids.len(), amount = action.amount))]
    pub async fn heal(&self, action: SupportAction) -> ActionReportDto {
        self.resolve(|state| resolve_heal(state, &action)).await
    }

    #[instrument(skip(self, action), fields(targets = action.target_ids.len(), amount = action.amount))]
    pub async fn grant_temp_hp(&self, action: SupportAction) -> ActionReportDto {
        self.resolve(|state| resolve_temp_hp(state, &action)).await
    }

    #[instrument(skip(self))]
    pub async fn set_current_hp(&self, id: CombatantId, value: i64) -> ActionReportDto {
        self.resolve(|state| resolve_set_hp(state, id, value)).await
    }

    #[instrument(skip(self))]
    pub async fn set_temp_hp(&self, id: CombatantId, value: i64) -> ActionReportDto {
        self.resolve(|state| resolve_set_temp_hp(state, id, value)).await
    }

    #[instrument(skip(self))]
    pub async fn afflict(
        &self,
        source_id: Option<CombatantId>,
        target_id: CombatantId,
        status: &str,
    ) -> ActionReportDto {
        self.resolve(|state| resolve_afflict(state, source_id, target_id, status))
            .await
    }

    #[instrument(skip(self))]
    pub async fn remove_condition(
        &self,
        source_id: Option<CombatantId>,
        target_id: CombatantId,
        status: &str,
    ) -> ActionReportDto {
        self.resolve(|state| resolve_remove_condition(state, source_id, target_id, status))
            .await
    }

    /// Resolve against the locked state and apply in the same critical
    /// section.
    async fn resolve<F>(&self, resolver: F) -> ActionReportDto
    where
        F: FnOnce(&CombatState) -> Resolution,
    {
        let now = self.clock.now();
        let mut state = self.state.write().await;
        let resolution = resolver(&state);
        let before = state.log_entries.len();
        if state.apply(resolution, now) {
            self.commit(&mut state, now);
        }
        let added = state.log_entries.len().saturating_sub(before);
        let entries: Vec<CombatLogEntry> = state.log_entries[..added].iter().rev().cloned().collect();
        ActionReportDto { roll: None, entries }
    }

    // ========================================================================
    // Log and lifecycle
    // ========================================================================

    #[instrument(skip(self))]
    pub async fn clear_log(&self) -> bool {
        let now = self.clock.now();
        let mut state = self.state.write().await;
        let cleared = state.clear_log();
        if cleared {
            self.commit(&mut state, now);
        }
        cleared
    }

    /// Archive the encounter. `None` when there was nothing to archive.
    #[instrument(skip(self))]
    pub async fn end_combat(&self) -> Option<CombatHistory> {
        let now = self.clock.now();
        let record = {
            let mut state = self.state.write().await;
            let id = state.end_combat(now)?;
            self.commit(&mut state, now);
            state.find_history(id).cloned()?
        };
        info!(history_id = %record.id, title = %record.title, rounds = record.rounds, "Combat archived");

        if let Some(backup) = &self.history_backup {
            if let Err(e) = backup.create(&record).await {
                warn!(history_id = %record.id, "Failed to back up combat history: {}", e);
            }
        }
        Some(record)
    }

    /// Clear the live encounter without archiving it.
    #[instrument(skip(self))]
    pub async fn reset(&self) {
        let now = self.clock.now();
        let mut state = self.state.write().await;
        state.reset();
        self.commit(&mut state, now);
        info!("Combat reset");
    }

    // ========================================================================
    // History
    // ========================================================================

    pub async fn history(&self) -> Vec<CombatHistory> {
        self.state.read().await.history.clone()
    }

    pub async fn get_history(&self, id: HistoryId) -> Option<CombatHistory> {
        self.state.read().await.find_history(id).cloned()
    }

    #[instrument(skip(self))]
    pub async fn rename_history(&self, id: HistoryId, title: &str) -> Result<CombatHistory> {
        let now = self.clock.now();
        let record = {
            let mut state = self.state.write().await;
            state.rename_history(id, title)?;
            self.commit(&mut state, now);
            state.find_history(id).cloned()
        };
        let record = record.ok_or_else(|| anyhow::anyhow!("Combat history {} vanished", id))?;

        if let Some(backup) = &self.history_backup {
            if let Err(e) = backup.update_title(id, &record.title).await {
                warn!(history_id = %id, "Failed to rename backed-up combat history: {}", e);
            }
        }
        Ok(record)
    }

    #[instrument(skip(self))]
    pub async fn delete_history(&self, id: HistoryId) -> bool {
        let now = self.clock.now();
        let deleted = {
            let mut state = self.state.write().await;
            let deleted = state.delete_history(id);
            if deleted {
                self.commit(&mut state, now);
            }
            deleted
        };
        if deleted {
            if let Some(backup) = &self.history_backup {
                if let Err(e) = backup.delete(id).await {
                    warn!(history_id = %id, "Failed to delete backed-up combat history: {}", e);
                }
            }
        }
        deleted
    }

    // ========================================================================
    // Sync
    // ========================================================================

    /// Adopt a snapshot written elsewhere if it is strictly newer. The
    /// snapshot is taken verbatim, version and timestamp included.
    pub async fn adopt_if_newer(&self, incoming: CombatState) -> bool {
        let mut state = self.state.write().await;
        if !state.is_superseded_by(&incoming) {
            return false;
        }
        info!(
            version = incoming.version,
            last_updated = ?incoming.last_updated,
            "Adopting newer combat snapshot"
        );
        *state = incoming;
        self.changes.send_replace(Arc::new(state.clone()));
        true
    }
}

//! Tournament manager: scoring devices, result submissions, and approval.
//!
//! A manager owns one [`Tournament`] for the length of a session. Remote
//! scoring devices are registered by id, matches are handed to idle devices,
//! and results come back as [`PendingScoreSubmission`]s that the organiser
//! approves or rejects. Every operation checks everything it needs before
//! mutating anything, so a failed call leaves the manager untouched.

use super::engine::ResultEffects;
use super::models::Tournament;
use crate::bracket::models::{
    DeviceId, Match, MatchId, MatchOutcome, MatchStatus, PlayerName, ScoreEvent, Stage,
};
use crate::errors::{TournamentError, TournamentResult};
use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

/// A result reported by a scoring device, waiting for approval
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingScoreSubmission {
    pub match_id: MatchId,
    /// Device that scored the match
    pub device_id: DeviceId,
    pub winner: PlayerName,
    pub score1: u32,
    pub score2: u32,
    pub sets1: u32,
    pub sets2: u32,
    pub history: Vec<ScoreEvent>,
    pub submitted_at: DateTime<Utc>,
}

impl PendingScoreSubmission {
    /// Wrap a scorer outcome, stamped now
    pub fn new(match_id: MatchId, device_id: impl Into<DeviceId>, outcome: MatchOutcome) -> Self {
        Self {
            match_id,
            device_id: device_id.into(),
            winner: outcome.winner,
            score1: outcome.score1,
            score2: outcome.score2,
            sets1: outcome.sets1,
            sets2: outcome.sets2,
            history: outcome.history,
            submitted_at: Utc::now(),
        }
    }

    /// The result this submission would record
    pub fn outcome(&self) -> MatchOutcome {
        MatchOutcome {
            winner: self.winner.clone(),
            score1: self.score1,
            score2: self.score2,
            sets1: self.sets1,
            sets2: self.sets2,
            history: self.history.clone(),
        }
    }
}

/// Notifications for the transport layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ManagerEvent {
    MatchAssigned {
        match_id: MatchId,
        device: DeviceId,
        player1: PlayerName,
        player2: PlayerName,
    },
    ResultApproved {
        match_id: MatchId,
        winner: PlayerName,
    },
    SubmissionRejected {
        match_id: MatchId,
        device: DeviceId,
        reason: String,
    },
    RoundGenerated {
        stage: Stage,
        round: u32,
    },
    TournamentComplete {
        champion: Option<PlayerName>,
    },
}

impl fmt::Display for ManagerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::MatchAssigned {
                match_id,
                device,
                player1,
                player2,
            } => format!("{player1} vs {player2} (match {match_id}) sent to {device}"),
            Self::ResultApproved { match_id, winner } => {
                format!("{winner} wins match {match_id}")
            }
            Self::SubmissionRejected {
                match_id,
                device,
                reason,
            } => format!("result for match {match_id} from {device} rejected: {reason}"),
            Self::RoundGenerated { stage, round } => format!("{stage} round {round} is ready"),
            Self::TournamentComplete { champion } => match champion {
                Some(champion) => format!("tournament complete, {champion} wins"),
                None => "tournament complete".to_string(),
            },
        };
        write!(f, "{repr}")
    }
}

/// Persisted form of a manager session
#[derive(Debug, Serialize, Deserialize)]
struct ManagerSnapshot {
    tournament: Tournament,
    devices: Vec<DeviceId>,
    pending: Vec<PendingScoreSubmission>,
}

/// Session orchestrator over one tournament
#[derive(Debug)]
pub struct TournamentManager {
    tournament: Tournament,
    /// Registered devices and the match each is scoring
    devices: HashMap<DeviceId, Option<MatchId>>,
    /// Devices known only from restored matches, not yet registered again
    restored: HashSet<DeviceId>,
    /// At most one submission per match
    pending: HashMap<MatchId, PendingScoreSubmission>,
    events: VecDeque<ManagerEvent>,
}

impl TournamentManager {
    /// Take over a tournament.
    ///
    /// Devices that still hold a match in the tournament (one restored from
    /// a snapshot, for instance) keep it and count as registered. Without a
    /// queued submission a match left `AwaitingApproval` goes back to
    /// `Assigned` so its device can report again.
    pub fn new(tournament: Tournament) -> Self {
        Self::restore(tournament, Vec::new(), Vec::new())
    }

    /// Rebuild a manager from [`TournamentManager::to_snapshot`] output
    ///
    /// # Errors
    ///
    /// Returns `Snapshot` on malformed input.
    pub fn from_snapshot(json: &str) -> TournamentResult<Self> {
        let snapshot: ManagerSnapshot = serde_json::from_str(json)?;
        Ok(Self::restore(
            snapshot.tournament,
            snapshot.devices,
            snapshot.pending,
        ))
    }

    /// Serialize the tournament, registered devices, and queued submissions
    ///
    /// # Errors
    ///
    /// Returns `Snapshot` if encoding fails.
    pub fn to_snapshot(&self) -> TournamentResult<String> {
        let mut devices: Vec<DeviceId> = self.devices.keys().cloned().collect();
        devices.sort();
        let snapshot = ManagerSnapshot {
            tournament: self.tournament.clone(),
            devices,
            pending: self.pending_submissions().into_iter().cloned().collect(),
        };
        Ok(serde_json::to_string_pretty(&snapshot)?)
    }

    fn restore(
        mut tournament: Tournament,
        registered: Vec<DeviceId>,
        submissions: Vec<PendingScoreSubmission>,
    ) -> Self {
        let mut devices: HashMap<DeviceId, Option<MatchId>> = HashMap::new();
        let mut restored = HashSet::new();
        let mut pending = HashMap::new();

        for submission in submissions {
            let queued = tournament
                .match_by_id(submission.match_id)
                .is_some_and(|m| {
                    m.status == MatchStatus::AwaitingApproval
                        && m.device.as_deref() == Some(submission.device_id.as_str())
                });
            if queued {
                pending.insert(submission.match_id, submission);
            } else {
                warn!(
                    "Dropping stale submission for match {} from {}",
                    submission.match_id, submission.device_id
                );
            }
        }

        for m in &mut tournament.matches {
            let held = matches!(
                m.status,
                MatchStatus::Assigned | MatchStatus::InProgress | MatchStatus::AwaitingApproval
            );
            let Some(device) = m.device.clone().filter(|_| held) else {
                continue;
            };
            // One match per device; a later claim goes back to the pool
            if devices.get(&device).is_some_and(Option::is_some) {
                pending.remove(&m.id);
                m.device = None;
                m.status = MatchStatus::Pending;
                warn!(
                    "{device} already holds a match, match {} returned to pending",
                    m.id
                );
                continue;
            }
            if m.status == MatchStatus::AwaitingApproval && !pending.contains_key(&m.id) {
                m.status = MatchStatus::Assigned;
                warn!(
                    "Submission for match {} was lost, {device} must report again",
                    m.id
                );
            }
            devices.insert(device.clone(), Some(m.id));
            restored.insert(device);
        }

        for device in registered {
            restored.remove(&device);
            devices.entry(device).or_insert(None);
        }

        if !devices.is_empty() {
            info!(
                "Manager resumed with {} device(s), {} busy, {} submission(s) queued",
                devices.len(),
                devices.values().filter(|m| m.is_some()).count(),
                pending.len()
            );
        }

        Self {
            tournament,
            devices,
            restored,
            pending,
            events: VecDeque::new(),
        }
    }

    pub fn tournament(&self) -> &Tournament {
        &self.tournament
    }

    /// Give up the session and keep the tournament
    pub fn into_tournament(self) -> Tournament {
        self.tournament
    }

    /// Register a scoring device. A device that already held a match when
    /// the manager was rebuilt keeps it on its first registration.
    ///
    /// # Errors
    ///
    /// `DeviceAlreadyRegistered` for a known id.
    pub fn register_device(&mut self, device: impl Into<DeviceId>) -> TournamentResult<()> {
        let device = device.into();
        if self.restored.remove(&device) {
            info!("Device {device} reconnected");
            return Ok(());
        }
        if self.devices.contains_key(&device) {
            return Err(TournamentError::DeviceAlreadyRegistered(device));
        }
        info!("Device {device} registered");
        self.devices.insert(device, None);
        Ok(())
    }

    /// Remove a device, returning the match it was scoring to `Pending`.
    ///
    /// # Errors
    ///
    /// * `DeviceNotFound` - unknown device
    /// * `DeviceBusy` - its result is waiting for approval; approve or
    ///   reject it first
    pub fn remove_device(&mut self, device: &str) -> TournamentResult<Option<MatchId>> {
        let occupied = *self
            .devices
            .get(device)
            .ok_or_else(|| TournamentError::DeviceNotFound(device.to_string()))?;

        if let Some(match_id) = occupied {
            let m = self.match_ref(match_id)?;
            if m.status == MatchStatus::AwaitingApproval {
                return Err(TournamentError::DeviceBusy {
                    device: device.to_string(),
                    match_id,
                });
            }
            self.release_match(match_id)?;
            warn!(
                "Device {device} removed while scoring match {match_id}, match returned to pending"
            );
        }

        self.devices.remove(device);
        self.restored.remove(device);
        info!("Device {device} removed");
        Ok(occupied)
    }

    /// Hand a ready match to an idle device
    ///
    /// # Errors
    ///
    /// * `DeviceNotFound` / `MatchNotFound` - unknown id
    /// * `DeviceBusy` - the device is scoring another match
    /// * `IllegalTransition` - the match is not `Pending`
    /// * `MatchNotReady` - a seat is still empty
    pub fn assign_match(&mut self, match_id: MatchId, device: &str) -> TournamentResult<()> {
        let occupied = self
            .devices
            .get(device)
            .ok_or_else(|| TournamentError::DeviceNotFound(device.to_string()))?;
        if let Some(busy_with) = *occupied {
            return Err(TournamentError::DeviceBusy {
                device: device.to_string(),
                match_id: busy_with,
            });
        }

        let m = self.match_ref(match_id)?;
        if m.status != MatchStatus::Pending {
            return Err(TournamentError::IllegalTransition {
                match_id,
                from: m.status,
                to: MatchStatus::Assigned,
            });
        }
        let (Some(player1), Some(player2)) = (m.player1.clone(), m.player2.clone()) else {
            return Err(TournamentError::MatchNotReady(match_id));
        };

        let m = self.match_mut(match_id)?;
        m.status = MatchStatus::Assigned;
        m.device = Some(device.to_string());
        self.devices.insert(device.to_string(), Some(match_id));

        info!("Match {match_id} assigned to {device}");
        self.events.push_back(ManagerEvent::MatchAssigned {
            match_id,
            device: device.to_string(),
            player1,
            player2,
        });
        Ok(())
    }

    /// Take a match back from its device
    ///
    /// # Errors
    ///
    /// `IllegalTransition` unless the match is `Assigned` or `InProgress`.
    pub fn unassign_match(&mut self, match_id: MatchId) -> TournamentResult<()> {
        self.release_match(match_id)?;
        info!("Match {match_id} unassigned");
        Ok(())
    }

    /// The device reported that play began
    ///
    /// # Errors
    ///
    /// `IllegalTransition` unless the match is `Assigned`.
    pub fn start_match(&mut self, match_id: MatchId) -> TournamentResult<()> {
        self.transition(match_id, MatchStatus::InProgress)?;
        info!("Match {match_id} in progress");
        Ok(())
    }

    /// Queue a device's result for approval, replacing any earlier one for
    /// the same match
    ///
    /// # Errors
    ///
    /// * `MatchNotFound` - unknown match
    /// * `IllegalTransition` - the match is not being scored
    /// * `DeviceMismatch` - the submitting device does not hold the match
    /// * `WinnerNotInMatch` - the winner is not one of the two players
    pub fn receive_submission(
        &mut self,
        submission: PendingScoreSubmission,
    ) -> TournamentResult<()> {
        let match_id = submission.match_id;
        let m = self.match_ref(match_id)?;
        if !m.status.can_transition_to(MatchStatus::AwaitingApproval) {
            return Err(TournamentError::IllegalTransition {
                match_id,
                from: m.status,
                to: MatchStatus::AwaitingApproval,
            });
        }
        if m.device.as_deref() != Some(submission.device_id.as_str()) {
            return Err(TournamentError::DeviceMismatch {
                device: submission.device_id,
                match_id,
            });
        }
        if !m.has_player(&submission.winner) {
            return Err(TournamentError::WinnerNotInMatch {
                match_id,
                winner: submission.winner,
            });
        }

        self.match_mut(match_id)?.status = MatchStatus::AwaitingApproval;
        info!(
            "Result for match {match_id} from {}: {} ({}-{})",
            submission.device_id, submission.winner, submission.score1, submission.score2
        );
        if self.pending.insert(match_id, submission).is_some() {
            info!("Earlier submission for match {match_id} replaced");
        }
        Ok(())
    }

    /// Make the queued result for a match authoritative
    ///
    /// # Errors
    ///
    /// `NoPendingSubmission` if nothing is queued for the match.
    pub fn approve(&mut self, match_id: MatchId) -> TournamentResult<ResultEffects> {
        let submission = self
            .pending
            .get(&match_id)
            .ok_or(TournamentError::NoPendingSubmission(match_id))?;
        let device = submission.device_id.clone();
        let winner = submission.winner.clone();

        let effects = self
            .tournament
            .record_result(match_id, submission.outcome())?;

        self.pending.remove(&match_id);
        self.free_device(&device, match_id);
        info!("Match {match_id} approved, {winner} advances");
        self.events
            .push_back(ManagerEvent::ResultApproved { match_id, winner });
        self.publish(&effects);
        Ok(effects)
    }

    /// Discard the queued result; the device keeps the match
    ///
    /// # Errors
    ///
    /// `NoPendingSubmission` if nothing is queued for the match.
    pub fn reject(&mut self, match_id: MatchId, reason: &str) -> TournamentResult<()> {
        if !self.pending.contains_key(&match_id) {
            return Err(TournamentError::NoPendingSubmission(match_id));
        }
        self.transition(match_id, MatchStatus::Assigned)?;

        if let Some(submission) = self.pending.remove(&match_id) {
            warn!(
                "Result for match {match_id} from {} rejected: {reason}",
                submission.device_id
            );
            self.events.push_back(ManagerEvent::SubmissionRejected {
                match_id,
                device: submission.device_id,
                reason: reason.to_string(),
            });
        }
        Ok(())
    }

    /// Record a result entered by the organiser, bypassing devices.
    ///
    /// Accepted while the match is `Pending`, `Assigned`, or `InProgress`;
    /// any device holding the match is freed.
    ///
    /// # Errors
    ///
    /// `IllegalTransition` while a submission awaits approval, otherwise the
    /// errors of [`Tournament::record_result`].
    pub fn record_result(
        &mut self,
        match_id: MatchId,
        outcome: MatchOutcome,
    ) -> TournamentResult<ResultEffects> {
        let m = self.match_ref(match_id)?;
        if m.status == MatchStatus::AwaitingApproval {
            return Err(TournamentError::IllegalTransition {
                match_id,
                from: m.status,
                to: MatchStatus::Complete,
            });
        }
        let device = m.device.clone();
        let winner = outcome.winner.clone();

        let effects = self.tournament.record_result(match_id, outcome)?;

        if let Some(device) = device {
            self.free_device(&device, match_id);
        }
        info!("Match {match_id} recorded by organiser, {winner} advances");
        self.events
            .push_back(ManagerEvent::ResultApproved { match_id, winner });
        self.publish(&effects);
        Ok(effects)
    }

    /// Queued submissions, oldest first
    pub fn pending_submissions(&self) -> Vec<&PendingScoreSubmission> {
        let mut queued: Vec<&PendingScoreSubmission> = self.pending.values().collect();
        queued.sort_by_key(|s| (s.submitted_at, s.match_id));
        queued
    }

    pub fn submission(&self, match_id: MatchId) -> Option<&PendingScoreSubmission> {
        self.pending.get(&match_id)
    }

    /// Matches that can be assigned right now
    pub fn ready_matches(&self) -> Vec<&Match> {
        self.tournament.ready_matches().collect()
    }

    /// Registered devices with nothing to score, sorted by id
    pub fn idle_devices(&self) -> Vec<&DeviceId> {
        let mut idle: Vec<&DeviceId> = self
            .devices
            .iter()
            .filter(|(_, m)| m.is_none())
            .map(|(d, _)| d)
            .collect();
        idle.sort();
        idle
    }

    /// Match a device is scoring
    pub fn device_match(&self, device: &str) -> Option<MatchId> {
        self.devices.get(device).copied().flatten()
    }

    pub fn drain_events(&mut self) -> VecDeque<ManagerEvent> {
        std::mem::take(&mut self.events)
    }

    fn match_ref(&self, match_id: MatchId) -> TournamentResult<&Match> {
        self.tournament
            .match_by_id(match_id)
            .ok_or(TournamentError::MatchNotFound(match_id))
    }

    fn match_mut(&mut self, match_id: MatchId) -> TournamentResult<&mut Match> {
        self.tournament
            .matches
            .iter_mut()
            .find(|m| m.id == match_id)
            .ok_or(TournamentError::MatchNotFound(match_id))
    }

    /// Move a match along a legal edge
    fn transition(&mut self, match_id: MatchId, to: MatchStatus) -> TournamentResult<()> {
        let m = self.match_mut(match_id)?;
        if !m.status.can_transition_to(to) {
            return Err(TournamentError::IllegalTransition {
                match_id,
                from: m.status,
                to,
            });
        }
        m.status = to;
        Ok(())
    }

    /// `Assigned | InProgress -> Pending`, freeing the device
    fn release_match(&mut self, match_id: MatchId) -> TournamentResult<()> {
        let m = self.match_mut(match_id)?;
        if !matches!(m.status, MatchStatus::Assigned | MatchStatus::InProgress) {
            return Err(TournamentError::IllegalTransition {
                match_id,
                from: m.status,
                to: MatchStatus::Pending,
            });
        }
        m.status = MatchStatus::Pending;
        if let Some(device) = m.device.take() {
            self.free_device(&device, match_id);
        }
        Ok(())
    }

    fn free_device(&mut self, device: &str, match_id: MatchId) {
        if let Some(slot) = self.devices.get_mut(device) {
            if *slot == Some(match_id) {
                *slot = None;
            }
        }
    }

    fn publish(&mut self, effects: &ResultEffects) {
        for &(stage, round) in &effects.generated {
            info!("{stage} round {round} generated");
            self.events
                .push_back(ManagerEvent::RoundGenerated { stage, round });
        }
        if effects.completed {
            let champion = self.tournament.champion().cloned();
            self.events
                .push_back(ManagerEvent::TournamentComplete { champion });
        }
    }
}

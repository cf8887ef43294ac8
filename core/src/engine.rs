//! The reputation engine: one session's orchestration context.
//!
//! INGEST ORDER (fixed, documented, never reordered):
//!   1. Event factory      (normalize the report)
//!   2. Witness sampler    (who noticed, how clearly)
//!   3. Interpretation     (what each witness now believes)
//!   4. Profile aggregator (witness, faction and cell mutations)
//!   5. Rumor graph        (rebuild edges, seed carriers)
//!
//! TICK ORDER (fixed, documented, never reordered):
//!   1. Profile decay
//!   2. Rumor propagation, whose cell mutations land on decayed profiles
//!
//! RULES:
//!   - The engine owns all mutable state; nothing is global.
//!   - One ingestion or one tick completes before the next starts.
//!     Timer-driven callers submit commands and drain them in order.
//!   - All randomness flows through the RngBank.
//!   - When a journal is attached, every command is recorded before it
//!     is applied. A failed append leaves the session untouched.
//!   - Journaled commands carry only finite numbers; inputs are
//!     sanitized first so replay rebuilds exactly what ran live.

use crate::{
    clock::SessionClock,
    command::{QueuedCommand, ReputationCommand},
    config::ReputationConfig,
    error::{ReputationError, ReputationResult},
    event::{create_reputation_event, ReputationEvent, ReputationEventInput},
    geometry::clamp,
    gossip::{seed_rumors_from_witness_records, RumorNetwork},
    interpretation::{interpret_witness_records, WitnessRecord},
    profile::{mutations_from_records, ProfileStore, ReputationProfile, ScopeKey},
    rng::{RngBank, SeededRng, StreamSlot},
    store::{JournalEntry, JournalStore},
    types::{SessionId, Tick, Timestamp},
    witness::{sample_witnesses, SamplingParams},
    world::{IngestContext, TileGrid, WorldQuery, ZoneGrid},
};
use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};

/// What one ingestion did.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct IngestReport {
    pub event_id:        String,
    pub witnesses:       usize,
    pub rumor_only:      usize,
    pub records:         usize,
    pub mutations:       usize,
    pub carriers_seeded: usize,
}

/// What one tick did.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TickReport {
    pub tick:            Tick,
    pub mutations:       usize,
    pub rumors_alive:    usize,
    pub exhausted_edges: Vec<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CommandOutcome {
    Ingested(IngestReport),
    Ticked(TickReport),
}

pub struct ReputationEngine {
    pub session_id:   SessionId,
    pub clock:        SessionClock,
    config:           ReputationConfig,
    rng_bank:         RngBank,
    event_ids:        SeededRng,
    profiles:         ProfileStore,
    network:          RumorNetwork,
    events:           Vec<ReputationEvent>,
    records:          BTreeMap<String, WitnessRecord>,
    records_by_event: BTreeMap<String, Vec<String>>,
    queue:            VecDeque<QueuedCommand>,
    journal:          Option<JournalStore>,
}

impl ReputationEngine {
    pub fn new(session_id: SessionId, seed: u64, config: ReputationConfig) -> Self {
        let rng_bank = RngBank::new(seed);
        Self {
            clock:            SessionClock::new(session_id.clone()),
            event_ids:        rng_bank.for_stream(StreamSlot::EventIds),
            rng_bank,
            profiles:         ProfileStore::new(config.profile.clone()),
            network:          RumorNetwork::new(config.gossip.clone()),
            config,
            events:           Vec::new(),
            records:          BTreeMap::new(),
            records_by_event: BTreeMap::new(),
            queue:            VecDeque::new(),
            journal:          None,
            session_id,
        }
    }

    /// Attach a migrated journal and register this session in it.
    pub fn with_journal(mut self, store: JournalStore) -> ReputationResult<Self> {
        store.insert_session(&self.session_id, self.rng_bank.seed(), env!("CARGO_PKG_VERSION"))?;
        self.journal = Some(store);
        Ok(self)
    }

    pub fn seed(&self) -> u64 {
        self.rng_bank.seed()
    }

    pub fn config(&self) -> &ReputationConfig {
        &self.config
    }

    // ── Ingestion ──────────────────────────────────────────────

    /// Run an action report through the whole pipeline.
    pub fn ingest_event(
        &mut self,
        input: ReputationEventInput,
        world: &dyn WorldQuery,
    ) -> ReputationResult<IngestReport> {
        let context = IngestContext::capture(world, &input.zone_id);
        let zone_id = input.zone_id.clone();
        let grid = ZoneGrid { world, zone_id: &zone_id };
        self.apply_ingest(input, context, &grid)
    }

    /// Ingest against an already-captured context. Replay uses this.
    pub fn apply_ingest(
        &mut self,
        input:   ReputationEventInput,
        context: IngestContext,
        grid:    &dyn TileGrid,
    ) -> ReputationResult<IngestReport> {
        let input = input.sanitized();
        let context = context.sanitized();
        self.journal_command(
            self.clock.current_tick,
            &ReputationCommand::Ingest { input: input.clone(), context: context.clone() },
        )?;

        let config = &self.config;
        let cell_size = config.witness.cell_size;

        let event = create_reputation_event(&input, self.clock.now, cell_size, &mut self.event_ids);

        let params = SamplingParams::new(
            context.environment.ambient_lighting(),
            context.environment.ambient_noise(),
            context.player.disguise_penalty(),
            config,
        );
        let candidates = sample_witnesses(
            &event,
            grid,
            &context.observers,
            context.zone_faction.as_deref(),
            &params,
            config,
        );

        let mut report = IngestReport {
            event_id:        event.id.clone(),
            witnesses:       candidates.len(),
            rumor_only:      candidates.iter().filter(|c| c.is_rumor_only).count(),
            records:         0,
            mutations:       0,
            carriers_seeded: 0,
        };

        if candidates.is_empty() {
            log::debug!("event={} witnesses=0 zone={}", event.id, event.zone_id);
        } else {
            let records = interpret_witness_records(&event, &candidates, config);
            let mutations = mutations_from_records(&records);
            self.profiles.apply_all(&mutations, event.timestamp);

            self.network.rebuild_edges(&context.observers, cell_size);
            let seeded = seed_rumors_from_witness_records(&event, &records, &config.gossip);

            report.records = records.len();
            report.mutations = mutations.len();
            report.carriers_seeded = seeded.len();
            self.network.seed(seeded);

            let ids = self.records_by_event.entry(event.id.clone()).or_default();
            for record in records {
                ids.push(record.id.clone());
                self.records.insert(record.id.clone(), record);
            }

            log::debug!(
                "event={} witnesses={} rumor_only={} records={} mutations={}",
                event.id,
                report.witnesses,
                report.rumor_only,
                report.records,
                report.mutations
            );
        }

        self.events.push(event);
        Ok(report)
    }

    // ── Tick ───────────────────────────────────────────────────

    /// Decay every profile, then advance every rumor.
    ///
    /// NaN or negative elapsed time counts as zero and +inf saturates;
    /// a non-finite timestamp reads as the clock's current time.
    pub fn tick(&mut self, elapsed_seconds: f64, timestamp: Timestamp) -> ReputationResult<TickReport> {
        let elapsed_seconds = clamp(elapsed_seconds, 0.0, f64::MAX);
        let timestamp = if timestamp.is_finite() { timestamp } else { self.clock.now };
        self.journal_command(self.clock.current_tick + 1, &ReputationCommand::Tick { elapsed_seconds, timestamp })?;

        let tick = self.clock.advance(elapsed_seconds, timestamp);

        self.profiles.decay_all(elapsed_seconds, timestamp);
        let (mutations, exhausted_edges) = self.network.advance(timestamp, elapsed_seconds);
        self.profiles.apply_all(&mutations, timestamp);

        let report = TickReport {
            tick,
            mutations: mutations.len(),
            rumors_alive: self.network.rumor_count(),
            exhausted_edges,
        };
        log::debug!(
            "tick={} mutations={} rumors={} exhausted_edges={}",
            report.tick,
            report.mutations,
            report.rumors_alive,
            report.exhausted_edges.len()
        );

        Ok(report)
    }

    /// Run n equal ticks starting after the clock's current time.
    pub fn run_ticks(&mut self, n: u64, tick_seconds: f64) -> ReputationResult<Vec<TickReport>> {
        let mut reports = Vec::with_capacity(n as usize);
        for _ in 0..n {
            let timestamp = self.clock.now + tick_seconds;
            reports.push(self.tick(tick_seconds, timestamp)?);
        }
        Ok(reports)
    }

    // ── Command queue ──────────────────────────────────────────

    /// Queue a command for the next `drain_commands`. Returns its id.
    pub fn submit(&mut self, command: ReputationCommand) -> String {
        let command_id = uuid::Uuid::new_v4().to_string();
        self.queue.push_back(QueuedCommand {
            session_id: self.session_id.clone(),
            queued_at:  self.clock.current_tick,
            command_id: command_id.clone(),
            command,
        });
        command_id
    }

    pub fn pending_commands(&self) -> usize {
        self.queue.len()
    }

    /// Apply every queued command in submission order. Each ingest reads
    /// the tiles of its own zone.
    pub fn drain_commands(&mut self, world: &dyn WorldQuery) -> ReputationResult<Vec<CommandOutcome>> {
        let mut outcomes = Vec::with_capacity(self.queue.len());
        while let Some(queued) = self.queue.pop_front() {
            outcomes.push(self.apply_command(queued.command, world)?);
        }
        Ok(outcomes)
    }

    fn apply_command(&mut self, command: ReputationCommand, world: &dyn WorldQuery) -> ReputationResult<CommandOutcome> {
        Ok(match command {
            ReputationCommand::Ingest { input, context } => {
                let zone_id = input.zone_id.clone();
                let grid = ZoneGrid { world, zone_id: &zone_id };
                CommandOutcome::Ingested(self.apply_ingest(input, context, &grid)?)
            }
            ReputationCommand::Tick { elapsed_seconds, timestamp } => {
                CommandOutcome::Ticked(self.tick(elapsed_seconds, timestamp)?)
            }
        })
    }

    // ── Journal & replay ───────────────────────────────────────

    fn journal_command(&self, tick: Tick, command: &ReputationCommand) -> ReputationResult<()> {
        let Some(store) = &self.journal else {
            return Ok(());
        };
        let entry = JournalEntry {
            seq:        None,
            session_id: self.session_id.clone(),
            tick,
            kind:       command.kind().to_string(),
            payload:    serde_json::to_string(command)?,
        };
        store.append_entry(&entry)?;
        Ok(())
    }

    /// Rebuild a session's derived state from its journal.
    ///
    /// `world` only answers tile queries; rosters and ambient state come
    /// from the journal. The returned engine has no journal attached, so
    /// replaying never appends to the session being replayed.
    pub fn replay(
        store:      &JournalStore,
        session_id: &str,
        config:     ReputationConfig,
        world:      &dyn WorldQuery,
    ) -> ReputationResult<Self> {
        let seed = store.session_seed(session_id)?;
        let mut engine = Self::new(session_id.to_string(), seed, config);

        let entries = store.entries_for_session(session_id)?;
        log::info!("Replaying session {session_id}: {} journal entries", entries.len());

        for entry in entries {
            let seq = entry.seq.unwrap_or_default();
            let command: ReputationCommand = serde_json::from_str(&entry.payload)
                .map_err(|e| ReputationError::JournalCorrupt { seq, reason: e.to_string() })?;
            if command.kind() != entry.kind {
                return Err(ReputationError::JournalCorrupt {
                    seq,
                    reason: format!("kind column '{}' does not match payload '{}'", entry.kind, command.kind()),
                });
            }
            engine.apply_command(command, world)?;
        }
        Ok(engine)
    }

    // ── Reads ──────────────────────────────────────────────────

    pub fn read_profile(&self, key: &ScopeKey) -> Option<&ReputationProfile> {
        self.profiles.get(key)
    }

    pub fn profiles(&self) -> &ProfileStore {
        &self.profiles
    }

    pub fn network(&self) -> &RumorNetwork {
        &self.network
    }

    pub fn events(&self) -> &[ReputationEvent] {
        &self.events
    }

    pub fn event(&self, event_id: &str) -> Option<&ReputationEvent> {
        self.events.iter().find(|e| e.id == event_id)
    }

    pub fn record(&self, record_id: &str) -> Option<&WitnessRecord> {
        self.records.get(record_id)
    }

    /// Records produced by one event, in witness order.
    pub fn records_for_event(&self, event_id: &str) -> Vec<&WitnessRecord> {
        self.records_by_event
            .get(event_id)
            .map(|ids| ids.iter().filter_map(|id| self.records.get(id)).collect())
            .unwrap_or_default()
    }

    pub fn journal(&self) -> Option<&JournalStore> {
        self.journal.as_ref()
    }
}

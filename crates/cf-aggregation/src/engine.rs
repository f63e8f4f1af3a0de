// Copyright (C) 2025-present The NetGauze Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//    http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or
// implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The per-entity aggregation engine.
//!
//! [AggregationState] holds the interval bookkeeping of every declared
//! argument of one calculated field attached to one entity. The host drives
//! it with [AggregationState::on_tick] once per batch of updates, or
//! periodically with no updates at all, and with
//! [AggregationState::on_restore] after loading a persisted snapshot.
//!
//! Every tick:
//! 1. Makes sure the bucket containing `now` exists for every argument.
//! 2. Applies the argument updates to the interval containing each sample.
//! 3. Classifies every tracked interval as expired (past the watermark),
//!    elapsed (past its duration, within the watermark), accumulating, or
//!    idle, and (re)computes the metrics of the arguments that need it through
//!    the [MetricFetcher].
//! 4. Prunes finalized intervals from every argument.
//! 5. Assembles one output row per interval that produced a value.
//!
//! The state is not synchronized: ticks of the same entity must never run
//! concurrently. `now` is read once by the caller and threaded through the
//! whole tick.

use crate::{
    argument::{ArgumentEntry, ArgumentUpdate},
    config::{AggregationConfig, ConfigurationError, OutputDescriptor},
    debug::{DebugPayload, DebugTracker},
    fetch::{EntityRef, MetricFetcher},
    interval::{IntervalCalculator, IntervalKey},
    status::IntervalStatus,
    value::Value,
    window::ArgumentWindow,
};
use chrono::{DateTime, TimeDelta, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use strum_macros::Display;
use tracing::{debug, trace, warn};

/// One output row: the values computed for one interval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputRow {
    /// Start of the interval the values belong to
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub ts: DateTime<Utc>,
    pub values: IndexMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickOutput {
    pub descriptor: OutputDescriptor,
    pub rows: Vec<OutputRow>,
}

/// Result of a tick. `Empty` means there is nothing to send, which is
/// different from sending an empty update.
#[derive(Debug, Clone, PartialEq)]
pub enum TickResult {
    Empty,
    Output(TickOutput),
}

impl TickResult {
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn rows(&self) -> &[OutputRow] {
        match self {
            Self::Empty => &[],
            Self::Output(output) => &output.rows,
        }
    }
}

/// Where an interval stands relative to `now`
#[derive(Display, Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum IntervalPhase {
    /// More than the watermark has passed since the interval ended
    Expired,
    /// The interval duration elapsed, late data is still accepted
    Elapsed,
    /// Still open, intermediate results are enabled
    Accumulating,
    Idle,
}

/// What to do for one (interval, argument) pair on this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Evaluation {
    /// Fetch the real aggregate. `catch_up` clears the pending argument
    /// refresh once the fetch succeeds.
    Refresh { catch_up: bool },
    /// Closed without ever being evaluated: report the default values
    Seed,
    Skip,
}

/// Counters of one tick, exposed to the host for telemetry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickStats {
    pub applied_updates: usize,
    pub ignored_updates: usize,
    pub fetches: usize,
    pub fetch_errors: usize,
    pub seeded: usize,
    pub pruned_intervals: usize,
}

/// Aggregation state of one calculated field on one entity
#[derive(Debug, Clone)]
pub struct AggregationState {
    entity: EntityRef,
    config: AggregationConfig,
    calculator: IntervalCalculator,
    watermark: TimeDelta,
    reevaluation_period: TimeDelta,
    intermediate_eval_period: TimeDelta,
    windows: IndexMap<String, ArgumentWindow>,
    debug_mode: bool,
    debug: Option<DebugTracker>,
    last_stats: TickStats,
}

fn to_time_delta(
    duration: std::time::Duration,
    field: &'static str,
) -> Result<TimeDelta, ConfigurationError> {
    TimeDelta::from_std(duration).map_err(|_| ConfigurationError::DurationOutOfRange(field))
}

impl AggregationState {
    /// Attaches the calculated field to `entity`, failing on an invalid
    /// configuration.
    pub fn new(entity: EntityRef, config: AggregationConfig) -> Result<Self, ConfigurationError> {
        config.validate()?;
        let calculator = IntervalCalculator::new(&config.interval)?;
        let watermark = to_time_delta(config.watermark, "watermark")?;
        let reevaluation_period =
            to_time_delta(config.reevaluation_period, "reevaluation_period")?;
        let intermediate_eval_period =
            to_time_delta(config.intermediate_eval_period, "intermediate_eval_period")?;
        let windows = config
            .arguments
            .keys()
            .map(|name| (name.clone(), ArgumentWindow::new()))
            .collect();
        Ok(Self {
            entity,
            config,
            calculator,
            watermark,
            reevaluation_period,
            intermediate_eval_period,
            windows,
            debug_mode: false,
            debug: None,
            last_stats: TickStats::default(),
        })
    }

    pub fn entity(&self) -> &EntityRef {
        &self.entity
    }

    pub fn config(&self) -> &AggregationConfig {
        &self.config
    }

    pub fn calculator(&self) -> &IntervalCalculator {
        &self.calculator
    }

    pub fn window(&self, argument: &str) -> Option<&ArgumentWindow> {
        self.windows.get(argument)
    }

    pub fn windows(&self) -> impl Iterator<Item = (&String, &ArgumentWindow)> {
        self.windows.iter()
    }

    /// Counters of the last tick
    pub fn last_stats(&self) -> TickStats {
        self.last_stats
    }

    /// Every interval tracked by at least one argument
    pub fn intervals(&self) -> BTreeSet<IntervalKey> {
        self.windows
            .values()
            .flat_map(|window| window.keys().copied())
            .collect()
    }

    /// The persistable part of the state: argument name to window
    pub fn snapshot(&self) -> HashMap<String, ArgumentWindow> {
        self.windows
            .iter()
            .map(|(name, window)| (name.clone(), window.clone()))
            .collect()
    }

    pub fn debug_mode(&self) -> bool {
        self.debug_mode
    }

    /// Enables or disables failure debugging. Disabling drops the tracker.
    pub fn set_debug_mode(&mut self, enabled: bool) {
        self.debug_mode = enabled;
        if !enabled {
            self.debug = None;
        }
    }

    /// Drops the collected debug data; a fresh tracker starts on the next
    /// tick.
    pub fn reset_debug_tracker(&mut self) {
        self.debug = None;
    }

    pub fn debug_snapshot(&self) -> Option<DebugPayload> {
        self.debug.as_ref().map(DebugTracker::payload)
    }

    /// Makes sure the bucket containing `now` exists in every argument window.
    pub fn ensure_current_interval(&mut self, now: DateTime<Utc>) -> IntervalKey {
        let current = self.calculator.current_interval_bounds(now);
        let mut created = false;
        for window in self.windows.values_mut() {
            created |= window.ensure_interval(current, now);
        }
        if created {
            debug!("[{}] created interval {current}", self.entity);
        }
        current
    }

    /// Merges a persisted snapshot into the argument windows and recreates
    /// the bookkeeping of the buckets missed while the entity was not
    /// running.
    ///
    /// Buckets already tracked keep the later of each timestamp, so state
    /// built by ticks that ran before the restore is preserved.
    ///
    /// Returns the number of backfilled buckets.
    pub fn on_restore(
        &mut self,
        snapshot: HashMap<String, ArgumentWindow>,
        now: DateTime<Utc>,
    ) -> usize {
        let mut latest: Option<IntervalKey> = None;
        for (name, window) in snapshot {
            match self.windows.get_mut(&name) {
                Some(existing) => {
                    latest = latest.max(window.latest_interval().copied());
                    existing.merge(window);
                }
                None => warn!(
                    "[{}] ignoring restored window of undeclared argument \"{name}\"",
                    self.entity
                ),
            }
        }
        match latest {
            Some(latest) => self.backfill(latest, now),
            None => {
                debug!("[{}] nothing to backfill from", self.entity);
                0
            }
        }
    }

    /// Walks from `latest` to the current bucket and creates a
    /// never-evaluated status for every bucket in between that did not expire
    /// yet. Expired buckets are not recreated.
    fn backfill(&mut self, latest: IntervalKey, now: DateTime<Utc>) -> usize {
        let current = self.calculator.current_interval_bounds(now);
        let threshold = now - self.watermark;
        let mut created = 0;
        let mut start = self.calculator.next_interval_start(latest.start());
        while start < current.start() {
            let key = self.calculator.interval_at(start);
            if key.end() >= threshold {
                let mut inserted = false;
                for window in self.windows.values_mut() {
                    inserted |= window.ensure_interval(key, now);
                }
                if inserted {
                    created += 1;
                    debug!("[{}] backfilled interval {key}", self.entity);
                }
            } else {
                trace!(
                    "[{}] not backfilling interval {key}, older than the watermark",
                    self.entity
                );
            }
            start = self.calculator.next_interval_start(key.start());
        }
        created
    }

    /// Runs one tick at `now` with the argument updates received since the
    /// previous one.
    pub fn on_tick<F>(
        &mut self,
        fetcher: &F,
        updates: Vec<ArgumentUpdate>,
        now: DateTime<Utc>,
    ) -> TickResult
    where
        F: MetricFetcher + ?Sized,
    {
        let mut stats = TickStats::default();
        if self.debug_mode && self.debug.is_none() {
            self.debug = Some(DebugTracker::new());
        }

        self.ensure_current_interval(now);
        for update in updates {
            if self.apply_update(update, now) {
                stats.applied_updates += 1;
            } else {
                stats.ignored_updates += 1;
            }
        }

        let mut computed: BTreeMap<IntervalKey, IndexMap<String, Value>> = BTreeMap::new();
        let mut finalized = Vec::new();
        for (interval, statuses) in self.flatten() {
            let phase = self.phase(&interval, now);
            trace!("[{}] interval {interval} is {phase}", self.entity);
            let mut failed = false;
            for (argument, status) in statuses {
                let evaluation = self.evaluation(phase, &status, now);
                if evaluation == Evaluation::Skip {
                    continue;
                }
                let (values, ok) =
                    self.compute(fetcher, &interval, &argument, evaluation, &mut stats);
                failed |= !ok;
                if ok {
                    if let Some(status) = self
                        .windows
                        .get_mut(&argument)
                        .and_then(|window| window.get_mut(&interval))
                    {
                        status.mark_evaluated(now);
                        if matches!(evaluation, Evaluation::Refresh { catch_up: true }) {
                            status.mark_caught_up();
                        }
                    }
                }
                if !values.is_empty() {
                    computed.entry(interval).or_default().extend(values);
                }
            }
            let done = match phase {
                IntervalPhase::Expired => true,
                IntervalPhase::Elapsed => self.watermark.is_zero(),
                IntervalPhase::Accumulating | IntervalPhase::Idle => false,
            };
            if done {
                if failed {
                    warn!(
                        "[{}] keeping interval {interval} for retry after a failed fetch",
                        self.entity
                    );
                } else {
                    finalized.push(interval);
                }
            }
        }

        for interval in &finalized {
            for window in self.windows.values_mut() {
                window.remove(interval);
            }
            debug!("[{}] finalized interval {interval}", self.entity);
        }
        stats.pruned_intervals = finalized.len();

        if let Some(tracker) = self.debug.as_mut() {
            for (interval, values) in &computed {
                tracker.record_processed(interval, Some(values));
            }
            for interval in &finalized {
                tracker.record_processed(interval, None);
            }
        }
        self.last_stats = stats;

        let rows: Vec<OutputRow> = computed
            .into_iter()
            .map(|(interval, values)| OutputRow {
                ts: interval.start(),
                values: self.ordered_rounded(values),
            })
            .filter(|row| !row.values.is_empty())
            .collect();
        if rows.is_empty() {
            TickResult::Empty
        } else {
            TickResult::Output(TickOutput {
                descriptor: self.config.output.clone(),
                rows,
            })
        }
    }

    /// Applies one argument update. Returns `false` when the update was
    /// ignored.
    fn apply_update(&mut self, update: ArgumentUpdate, now: DateTime<Utc>) -> bool {
        let Some(window) = self.windows.get_mut(&update.name) else {
            warn!(
                "[{}] ignoring update of undeclared argument \"{}\"",
                self.entity, update.name
            );
            return false;
        };

        if let Some(tracker) = self.debug.as_mut() {
            let raw = update.raw_value();
            let touched: Vec<IntervalKey> = if update.force_reset_previous {
                window.keys().copied().collect()
            } else {
                match &update.entry {
                    ArgumentEntry::Sample { ts, .. } => window.find(*ts).into_iter().copied().collect(),
                    ArgumentEntry::Samples { samples } => {
                        let keys: BTreeSet<IntervalKey> = samples
                            .iter()
                            .filter_map(|sample| window.find(sample.ts).copied())
                            .collect();
                        keys.into_iter().collect()
                    }
                    ArgumentEntry::Window { window: incoming } => incoming.keys().copied().collect(),
                    ArgumentEntry::Attribute { .. } => vec![],
                }
            };
            for interval in &touched {
                tracker.record_argument(interval, &update.name, raw.clone());
            }
        }

        match update.entry {
            ArgumentEntry::Sample { ts, .. } => {
                let refreshed = window.refresh_sample(ts, now);
                if refreshed.is_none() {
                    trace!(
                        "[{}] sample of \"{}\" at {ts} is outside every tracked interval",
                        self.entity,
                        update.name
                    );
                }
                refreshed.is_some()
            }
            ArgumentEntry::Samples { samples } => {
                let mut any = false;
                for sample in samples {
                    any |= window.refresh_sample(sample.ts, now).is_some();
                }
                any
            }
            ArgumentEntry::Window { window: incoming } => {
                if update.force_reset_previous {
                    *window = incoming;
                } else {
                    window.merge(incoming);
                }
                true
            }
            ArgumentEntry::Attribute { .. } => {
                warn!(
                    "[{}] argument \"{}\" received an update without interval semantics, ignoring",
                    self.entity, update.name
                );
                false
            }
        }
    }

    /// interval -> (argument -> status) across all argument windows. An
    /// argument missing an interval is simply absent from its map.
    fn flatten(&self) -> BTreeMap<IntervalKey, IndexMap<String, IntervalStatus>> {
        let mut flattened: BTreeMap<IntervalKey, IndexMap<String, IntervalStatus>> =
            BTreeMap::new();
        for (argument, window) in &self.windows {
            for (interval, status) in window.iter() {
                flattened
                    .entry(*interval)
                    .or_default()
                    .insert(argument.clone(), *status);
            }
        }
        flattened
    }

    pub(crate) fn phase(&self, interval: &IntervalKey, now: DateTime<Utc>) -> IntervalPhase {
        let since_end = now - interval.end();
        let since_start = now - interval.start();
        if since_end > self.watermark {
            IntervalPhase::Expired
        } else if since_start >= interval.nominal_duration() {
            IntervalPhase::Elapsed
        } else if self.config.produce_intermediate_result {
            IntervalPhase::Accumulating
        } else {
            IntervalPhase::Idle
        }
    }

    fn evaluation(
        &self,
        phase: IntervalPhase,
        status: &IntervalStatus,
        now: DateTime<Utc>,
    ) -> Evaluation {
        match phase {
            IntervalPhase::Expired => {
                if status.args_updated_since_last_eval() {
                    Evaluation::Refresh { catch_up: false }
                } else if status.never_evaluated() {
                    Evaluation::Seed
                } else {
                    Evaluation::Skip
                }
            }
            IntervalPhase::Elapsed => Self::recalculation(status, self.reevaluation_period, now),
            IntervalPhase::Accumulating => {
                Self::recalculation(status, self.intermediate_eval_period, now)
            }
            IntervalPhase::Idle => Evaluation::Skip,
        }
    }

    fn recalculation(
        status: &IntervalStatus,
        check_period: TimeDelta,
        now: DateTime<Utc>,
    ) -> Evaluation {
        if !status.eval_interval_elapsed(check_period, now) {
            Evaluation::Skip
        } else if status.args_updated_since_last_eval() {
            Evaluation::Refresh { catch_up: true }
        } else if status.never_evaluated() {
            Evaluation::Seed
        } else {
            Evaluation::Skip
        }
    }

    /// Computes every metric sourced from `argument` over `interval`.
    ///
    /// Returns the non-empty values and whether every fetch succeeded.
    fn compute<F>(
        &self,
        fetcher: &F,
        interval: &IntervalKey,
        argument: &str,
        evaluation: Evaluation,
        stats: &mut TickStats,
    ) -> (IndexMap<String, Value>, bool)
    where
        F: MetricFetcher + ?Sized,
    {
        let mut values = IndexMap::new();
        let mut ok = true;
        let Some(argument_config) = self.config.arguments.get(argument) else {
            return (values, ok);
        };
        let argument_key = argument_config.key.as_str();
        for (name, metric) in self
            .config
            .metrics
            .iter()
            .filter(|(_, metric)| metric.input == argument)
        {
            let value = match evaluation {
                Evaluation::Refresh { .. } => {
                    stats.fetches += 1;
                    match fetcher.fetch_aggregate(&self.entity, argument_key, metric, interval) {
                        Ok(value) => value,
                        Err(err) => {
                            stats.fetch_errors += 1;
                            ok = false;
                            warn!(
                                "[{}] failed to compute \"{name}\" for interval {interval}: {err}",
                                self.entity
                            );
                            None
                        }
                    }
                }
                Evaluation::Seed => {
                    stats.seeded += 1;
                    fetcher.default_seed_value(argument_key, metric)
                }
                Evaluation::Skip => None,
            };
            if let Some(value) = value {
                values.insert(name.clone(), value);
            }
        }
        (values, ok)
    }

    /// Orders values as the metrics are declared and applies rounding
    fn ordered_rounded(&self, mut values: IndexMap<String, Value>) -> IndexMap<String, Value> {
        self.config
            .metrics
            .iter()
            .filter_map(|(name, metric)| {
                values
                    .swap_remove(name)
                    .map(|value| (name.clone(), value.round(self.config.decimals_for(metric))))
            })
            .collect()
    }
}

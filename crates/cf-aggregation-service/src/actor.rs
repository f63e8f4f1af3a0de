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

//! # Entity aggregation actor
//!
//! One `AggregationActor` owns the [AggregationState] of one calculated field
//! attached to one entity. The state is moved into the actor task when the
//! actor is spawned and is only reachable through the actor's command
//! channel, so ticks of the same entity never overlap.
//!
//! The actor runs a tick:
//! 1. For every batch of argument updates received on the command channel.
//! 2. Periodically with no updates, so that buckets close and get finalized
//!    even when the entity goes quiet.
//!
//! Non-empty tick results are published as [EntityOutput] on the output
//! channel shared by all actors. Commands are prioritized over the periodic
//! timer.
//!
//! ```rust,no_run
//! use netgauze_cf_aggregation::{
//!     argument::{ArgumentConfig, ArgumentUpdate},
//!     config::AggregationConfig,
//!     fetch::{EntityRef, FetchError, MetricFetcher},
//!     interval::{IntervalConfig, IntervalKey, IntervalKind},
//!     metric::{AggFunction, MetricDefinition},
//!     value::Value,
//! };
//! use netgauze_cf_aggregation_service::{
//!     actor::{ActorConfig, ActorHandle},
//!     create_output_channel, SystemClock,
//! };
//! use std::sync::Arc;
//!
//! #[derive(Debug)]
//! struct Storage;
//!
//! impl MetricFetcher for Storage {
//!     fn fetch_aggregate(
//!         &self,
//!         _entity: &EntityRef,
//!         _argument_key: &str,
//!         _metric: &MetricDefinition,
//!         _interval: &IntervalKey,
//!     ) -> Result<Option<Value>, FetchError> {
//!         Ok(Some(Value::Double(21.5)))
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AggregationConfig::new(IntervalConfig::new(IntervalKind::Hour, "UTC"))
//!         .with_argument("temp", ArgumentConfig::new("temperature"))
//!         .with_metric("avgTemp", MetricDefinition::new("temp", AggFunction::Avg));
//!     let (tx, rx) = create_output_channel(100);
//!     let meter = opentelemetry::global::meter("cf-aggregation");
//!     let (join_handle, handle) = ActorHandle::new(
//!         EntityRef::new("tenant", "device"),
//!         config,
//!         Arc::new(Storage),
//!         Arc::new(SystemClock),
//!         tx,
//!         ActorConfig::default(),
//!         either::Either::Left(meter),
//!     )
//!     .unwrap();
//!     handle
//!         .update(vec![ArgumentUpdate::sample("temp", chrono::Utc::now(), 21.5)])
//!         .await
//!         .unwrap();
//!     let _output = rx.recv().await;
//!     handle.shutdown().await.unwrap();
//!     join_handle.await.unwrap().unwrap();
//! }
//! ```

use crate::{
    config::{default_cmd_buffer_size, default_send_timeout, default_tick_period},
    EntityOutput, OutputSender, SharedClock, SharedFetcher,
};
use netgauze_cf_aggregation::{
    argument::ArgumentUpdate,
    config::{AggregationConfig, ConfigurationError},
    debug::DebugPayload,
    engine::{AggregationState, TickResult},
    fetch::EntityRef,
    window::ArgumentWindow,
    OTL_ENTITY_ID_KEY, OTL_TENANT_ID_KEY,
};
use opentelemetry::{
    metrics::{Counter, Meter},
    KeyValue,
};
use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::{
    runtime::{Handle, RuntimeFlavor},
    sync::{mpsc, oneshot},
    task::JoinHandle,
    time::MissedTickBehavior,
};
use tracing::{debug, error, info, trace, warn};

const MIN_TICK_PERIOD: Duration = Duration::from_millis(1);

/// Runs engine work that may block on the metric fetcher.
///
/// On a multi-thread runtime the worker hands its queued tasks over to
/// another thread first, so a slow backend only stalls this entity. A
/// current-thread runtime cannot do that and runs `f` inline.
fn run_blocking<R>(f: impl FnOnce() -> R) -> R {
    match Handle::try_current().map(|handle| handle.runtime_flavor()) {
        Ok(RuntimeFlavor::MultiThread) => tokio::task::block_in_place(f),
        _ => f(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorConfig {
    pub cmd_buffer_size: usize,
    pub tick_period: Duration,
    pub send_timeout: Duration,
    pub debug_mode: bool,
}

impl Default for ActorConfig {
    fn default() -> Self {
        Self {
            cmd_buffer_size: default_cmd_buffer_size(),
            tick_period: default_tick_period(),
            send_timeout: default_send_timeout(),
            debug_mode: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AggregationStats {
    pub received_updates: Counter<u64>,
    pub ticks: Counter<u64>,
    pub emitted_rows: Counter<u64>,
    pub fetch_errors: Counter<u64>,
    pub pruned_intervals: Counter<u64>,
    pub send_timeout: Counter<u64>,
    pub send_error: Counter<u64>,
}

impl AggregationStats {
    pub fn new(meter: Meter) -> Self {
        let received_updates = meter
            .u64_counter("netgauze.cf.aggregation.received.updates")
            .with_description("Number of argument updates received by entity actors")
            .build();
        let ticks = meter
            .u64_counter("netgauze.cf.aggregation.ticks")
            .with_description("Number of ticks run, update driven and time driven")
            .build();
        let emitted_rows = meter
            .u64_counter("netgauze.cf.aggregation.emitted.rows")
            .with_description("Number of output rows successfully sent downstream")
            .build();
        let fetch_errors = meter
            .u64_counter("netgauze.cf.aggregation.fetch.errors")
            .with_description("Number of failed metric fetches, retried on the next tick")
            .build();
        let pruned_intervals = meter
            .u64_counter("netgauze.cf.aggregation.pruned.intervals")
            .with_description("Number of finalized intervals removed from the state")
            .build();
        let send_timeout = meter
            .u64_counter("netgauze.cf.aggregation.send.timeout")
            .with_description("Number of outputs timed out and dropped while sending downstream")
            .build();
        let send_error = meter
            .u64_counter("netgauze.cf.aggregation.send.error")
            .with_description("Number of outputs failed to be sent downstream")
            .build();
        Self {
            received_updates,
            ticks,
            emitted_rows,
            fetch_errors,
            pruned_intervals,
            send_timeout,
            send_error,
        }
    }
}

#[derive(Debug, strum_macros::Display)]
pub(crate) enum ActorCommand {
    /// Argument updates, processed in one tick
    Update(Vec<ArgumentUpdate>),
    /// A time-driven tick outside the periodic timer
    Tick,
    Restore(HashMap<String, ArgumentWindow>, oneshot::Sender<usize>),
    Snapshot(oneshot::Sender<HashMap<String, ArgumentWindow>>),
    DebugSnapshot(oneshot::Sender<Option<DebugPayload>>),
    SetDebugMode(bool),
    Shutdown(oneshot::Sender<EntityRef>),
}

#[derive(Debug)]
pub enum AggregationActorError {
    CommandChannelClosed(EntityRef),
}

impl std::fmt::Display for AggregationActorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CommandChannelClosed(entity) => {
                write!(f, "[Actor {entity}] command channel closed")
            }
        }
    }
}

impl std::error::Error for AggregationActorError {}

struct AggregationActor {
    entity: EntityRef,
    state: AggregationState,
    fetcher: SharedFetcher,
    clock: SharedClock,
    cmd_rx: mpsc::Receiver<ActorCommand>,
    tx: OutputSender,
    tick_period: Duration,
    send_timeout: Duration,
    stats: AggregationStats,
    tags: [KeyValue; 2],
}

impl AggregationActor {
    fn new(
        state: AggregationState,
        fetcher: SharedFetcher,
        clock: SharedClock,
        cmd_rx: mpsc::Receiver<ActorCommand>,
        tx: OutputSender,
        config: &ActorConfig,
        stats: AggregationStats,
    ) -> Self {
        let entity = state.entity().clone();
        let tags = [
            KeyValue::new(OTL_TENANT_ID_KEY, entity.tenant_id.clone()),
            KeyValue::new(OTL_ENTITY_ID_KEY, entity.entity_id.clone()),
        ];
        Self {
            entity,
            state,
            fetcher,
            clock,
            cmd_rx,
            tx,
            tick_period: config.tick_period.max(MIN_TICK_PERIOD),
            send_timeout: config.send_timeout,
            stats,
            tags,
        }
    }

    /// Runs one engine tick and publishes its output
    async fn tick(&mut self, updates: Vec<ArgumentUpdate>) {
        let now = self.clock.now();
        if !updates.is_empty() {
            self.stats
                .received_updates
                .add(updates.len() as u64, &self.tags);
        }
        self.stats.ticks.add(1, &self.tags);

        let fetcher = self.fetcher.as_ref();
        let state = &mut self.state;
        let result = run_blocking(|| state.on_tick(fetcher, updates, now));

        let tick_stats = self.state.last_stats();
        if tick_stats.fetch_errors > 0 {
            self.stats
                .fetch_errors
                .add(tick_stats.fetch_errors as u64, &self.tags);
        }
        if tick_stats.pruned_intervals > 0 {
            self.stats
                .pruned_intervals
                .add(tick_stats.pruned_intervals as u64, &self.tags);
        }

        let TickResult::Output(output) = result else {
            return;
        };
        let rows = output.rows.len() as u64;
        let message = Arc::new(EntityOutput {
            entity: self.entity.clone(),
            output,
        });
        match tokio::time::timeout(self.send_timeout, self.tx.send(message)).await {
            Ok(Ok(())) => self.stats.emitted_rows.add(rows, &self.tags),
            Ok(Err(err)) => {
                error!("[Actor {}] output send error: {err}", self.entity);
                self.stats.send_error.add(1, &self.tags);
            }
            Err(_) => {
                warn!("[Actor {}] output send timeout, dropping output", self.entity);
                self.stats.send_timeout.add(1, &self.tags);
            }
        }
    }

    /// Returns `true` when the actor must stop
    async fn handle_cmd(&mut self, cmd: Option<ActorCommand>) -> Result<bool, AggregationActorError> {
        if let Some(cmd) = &cmd {
            trace!("[Actor {}] handling command {cmd}", self.entity);
        }
        match cmd {
            Some(ActorCommand::Update(updates)) => {
                self.tick(updates).await;
            }
            Some(ActorCommand::Tick) => {
                self.tick(vec![]).await;
            }
            Some(ActorCommand::Restore(snapshot, tx)) => {
                let backfilled = self.state.on_restore(snapshot, self.clock.now());
                info!(
                    "[Actor {}] restored state, backfilled {backfilled} intervals",
                    self.entity
                );
                if tx.send(backfilled).is_err() {
                    error!("[Actor {}] unable to send back the restore result", self.entity);
                }
            }
            Some(ActorCommand::Snapshot(tx)) => {
                if tx.send(self.state.snapshot()).is_err() {
                    error!("[Actor {}] unable to send back the snapshot", self.entity);
                }
            }
            Some(ActorCommand::DebugSnapshot(tx)) => {
                if tx.send(self.state.debug_snapshot()).is_err() {
                    error!(
                        "[Actor {}] unable to send back the debug snapshot",
                        self.entity
                    );
                }
            }
            Some(ActorCommand::SetDebugMode(enabled)) => {
                debug!("[Actor {}] setting debug mode to {enabled}", self.entity);
                self.state.set_debug_mode(enabled);
            }
            Some(ActorCommand::Shutdown(tx)) => {
                info!("[Actor {}] received shutdown command", self.entity);
                let _ = tx.send(self.entity.clone());
                return Ok(true);
            }
            None => {
                warn!(
                    "[Actor {}] command channel is closed, shutting down actor",
                    self.entity
                );
                return Err(AggregationActorError::CommandChannelClosed(
                    self.entity.clone(),
                ));
            }
        }
        Ok(false)
    }

    async fn run(mut self) -> Result<EntityRef, AggregationActorError> {
        info!("[Actor {}] starting aggregation actor", self.entity);
        let mut timer = tokio::time::interval(self.tick_period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick of an interval completes immediately
        timer.tick().await;
        loop {
            tokio::select! {
                biased;
                cmd = self.cmd_rx.recv() => {
                    match self.handle_cmd(cmd).await {
                        Ok(true) => return Ok(self.entity),
                        Ok(false) => {}
                        Err(err) => return Err(err),
                    }
                }
                _ = timer.tick() => {
                    self.tick(vec![]).await;
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorHandleError {
    SendError,
    ReceiveError,
}

impl std::fmt::Display for ActorHandleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            ActorHandleError::SendError => {
                write!(f, "error sending command to actor")
            }
            ActorHandleError::ReceiveError => {
                write!(f, "error receiving response from actor")
            }
        }
    }
}

impl std::error::Error for ActorHandleError {}

/// Cloneable interface to an entity actor
#[derive(Debug, Clone)]
pub struct ActorHandle {
    entity: EntityRef,
    cmd_tx: mpsc::Sender<ActorCommand>,
}

impl ActorHandle {
    /// Validates `config` and spawns the actor of `entity`. An invalid
    /// configuration is reported here and no task is spawned.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        entity: EntityRef,
        config: AggregationConfig,
        fetcher: SharedFetcher,
        clock: SharedClock,
        tx: OutputSender,
        actor_config: ActorConfig,
        stats: either::Either<Meter, AggregationStats>,
    ) -> Result<
        (
            JoinHandle<Result<EntityRef, AggregationActorError>>,
            Self,
        ),
        ConfigurationError,
    > {
        let mut state = AggregationState::new(entity.clone(), config)?;
        state.set_debug_mode(actor_config.debug_mode);
        let stats = match stats {
            either::Either::Left(meter) => AggregationStats::new(meter),
            either::Either::Right(stats) => stats,
        };
        let (cmd_tx, cmd_rx) = mpsc::channel(actor_config.cmd_buffer_size.max(1));
        let actor = AggregationActor::new(state, fetcher, clock, cmd_rx, tx, &actor_config, stats);
        let join_handle = tokio::spawn(actor.run());
        Ok((join_handle, Self { entity, cmd_tx }))
    }

    pub fn entity(&self) -> &EntityRef {
        &self.entity
    }

    async fn send(&self, cmd: ActorCommand) -> Result<(), ActorHandleError> {
        self.cmd_tx
            .send(cmd)
            .await
            .map_err(|_| ActorHandleError::SendError)
    }

    /// Queues a batch of argument updates. The batch is processed in a single
    /// tick.
    pub async fn update(&self, updates: Vec<ArgumentUpdate>) -> Result<(), ActorHandleError> {
        self.send(ActorCommand::Update(updates)).await
    }

    pub async fn tick(&self) -> Result<(), ActorHandleError> {
        self.send(ActorCommand::Tick).await
    }

    /// Loads a persisted snapshot, returns the number of backfilled intervals
    pub async fn restore(
        &self,
        snapshot: HashMap<String, ArgumentWindow>,
    ) -> Result<usize, ActorHandleError> {
        let (tx, rx) = oneshot::channel();
        self.send(ActorCommand::Restore(snapshot, tx)).await?;
        rx.await.map_err(|_| ActorHandleError::ReceiveError)
    }

    pub async fn snapshot(&self) -> Result<HashMap<String, ArgumentWindow>, ActorHandleError> {
        let (tx, rx) = oneshot::channel();
        self.send(ActorCommand::Snapshot(tx)).await?;
        rx.await.map_err(|_| ActorHandleError::ReceiveError)
    }

    pub async fn debug_snapshot(&self) -> Result<Option<DebugPayload>, ActorHandleError> {
        let (tx, rx) = oneshot::channel();
        self.send(ActorCommand::DebugSnapshot(tx)).await?;
        rx.await.map_err(|_| ActorHandleError::ReceiveError)
    }

    pub async fn set_debug_mode(&self, enabled: bool) -> Result<(), ActorHandleError> {
        self.send(ActorCommand::SetDebugMode(enabled)).await
    }

    pub async fn shutdown(&self) -> Result<EntityRef, ActorHandleError> {
        let (tx, rx) = oneshot::channel();
        self.send(ActorCommand::Shutdown(tx)).await?;
        rx.await.map_err(|_| ActorHandleError::ReceiveError)
    }
}

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

//! # Aggregation supervisor
//!
//! Keeps one [ActorHandle] per entity with an attached calculated field.
//! Attaching spawns the entity actor, detaching shuts it down and drops its
//! state. Argument updates are routed to the owning actor, and the outputs of
//! all actors are published on one channel obtained with
//! [Supervisor::subscribe].

use crate::{
    actor::{ActorConfig, ActorHandle, ActorHandleError, AggregationActorError, AggregationStats},
    create_output_channel, OutputReceiver, OutputSender, SharedClock, SharedFetcher,
};
use netgauze_cf_aggregation::{
    argument::ArgumentUpdate,
    config::{AggregationConfig, ConfigurationError},
    debug::DebugPayload,
    fetch::EntityRef,
    window::ArgumentWindow,
};
use opentelemetry::metrics::Meter;
use std::collections::HashMap;
use tokio::task::JoinHandle;
use tracing::{error, info};

#[derive(Debug)]
pub enum SupervisorError {
    UnknownEntity(EntityRef),
    AlreadyAttached(EntityRef),
    Configuration(EntityRef, ConfigurationError),
    Actor(EntityRef, ActorHandleError),
}

impl std::fmt::Display for SupervisorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownEntity(entity) => {
                write!(f, "no calculated field attached to entity {entity}")
            }
            Self::AlreadyAttached(entity) => {
                write!(f, "a calculated field is already attached to entity {entity}")
            }
            Self::Configuration(entity, err) => {
                write!(f, "invalid configuration for entity {entity}: {err}")
            }
            Self::Actor(entity, err) => write!(f, "actor of entity {entity} failed: {err}"),
        }
    }
}

impl std::error::Error for SupervisorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Configuration(_, err) => Some(err),
            Self::Actor(_, err) => Some(err),
            _ => None,
        }
    }
}

type ActorJoinHandle = JoinHandle<Result<EntityRef, AggregationActorError>>;

pub struct Supervisor {
    actors: HashMap<EntityRef, (ActorHandle, ActorJoinHandle)>,
    actor_config: ActorConfig,
    fetcher: SharedFetcher,
    clock: SharedClock,
    stats: AggregationStats,
    tx: OutputSender,
    rx: OutputReceiver,
}

impl Supervisor {
    pub fn new(
        actor_config: ActorConfig,
        output_buffer_size: usize,
        fetcher: SharedFetcher,
        clock: SharedClock,
        meter: Meter,
    ) -> Self {
        let (tx, rx) = create_output_channel(output_buffer_size.max(1));
        Self {
            actors: HashMap::new(),
            actor_config,
            fetcher,
            clock,
            stats: AggregationStats::new(meter),
            tx,
            rx,
        }
    }

    /// Receiver of the outputs of every attached entity
    pub fn subscribe(&self) -> OutputReceiver {
        self.rx.clone()
    }

    pub fn len(&self) -> usize {
        self.actors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }

    pub fn entities(&self) -> impl Iterator<Item = &EntityRef> {
        self.actors.keys()
    }

    pub fn is_attached(&self, entity: &EntityRef) -> bool {
        self.actors.contains_key(entity)
    }

    fn handle(&self, entity: &EntityRef) -> Result<&ActorHandle, SupervisorError> {
        self.actors
            .get(entity)
            .map(|(handle, _)| handle)
            .ok_or_else(|| SupervisorError::UnknownEntity(entity.clone()))
    }

    /// Attaches a calculated field to `entity` and starts its actor
    pub fn attach(
        &mut self,
        entity: EntityRef,
        config: AggregationConfig,
    ) -> Result<(), SupervisorError> {
        if self.actors.contains_key(&entity) {
            return Err(SupervisorError::AlreadyAttached(entity));
        }
        let (join_handle, handle) = ActorHandle::new(
            entity.clone(),
            config,
            self.fetcher.clone(),
            self.clock.clone(),
            self.tx.clone(),
            self.actor_config.clone(),
            either::Either::Right(self.stats.clone()),
        )
        .map_err(|err| {
            error!("[Supervisor] rejected configuration of entity {entity}: {err}");
            SupervisorError::Configuration(entity.clone(), err)
        })?;
        info!("[Supervisor] attached calculated field to entity {entity}");
        self.actors.insert(entity, (handle, join_handle));
        Ok(())
    }

    /// Detaches the calculated field of `entity`, its state is dropped
    pub async fn detach(&mut self, entity: &EntityRef) -> Result<(), SupervisorError> {
        let (handle, join_handle) = self
            .actors
            .remove(entity)
            .ok_or_else(|| SupervisorError::UnknownEntity(entity.clone()))?;
        Self::stop(handle, join_handle).await;
        info!("[Supervisor] detached calculated field from entity {entity}");
        Ok(())
    }

    async fn stop(handle: ActorHandle, join_handle: ActorJoinHandle) {
        if let Err(err) = handle.shutdown().await {
            error!(
                "[Supervisor] failed to shut down actor of entity {}: {err}",
                handle.entity()
            );
        }
        match join_handle.await {
            Ok(Ok(_)) => {}
            Ok(Err(err)) => error!("[Supervisor] actor terminated with error: {err}"),
            Err(err) => error!("[Supervisor] unrecoverable error in actor: {err:?}"),
        }
    }

    /// Routes a batch of argument updates to the actor owning `entity`
    pub async fn dispatch(
        &self,
        entity: &EntityRef,
        updates: Vec<ArgumentUpdate>,
    ) -> Result<(), SupervisorError> {
        self.handle(entity)?
            .update(updates)
            .await
            .map_err(|err| SupervisorError::Actor(entity.clone(), err))
    }

    pub async fn restore(
        &self,
        entity: &EntityRef,
        snapshot: HashMap<String, ArgumentWindow>,
    ) -> Result<usize, SupervisorError> {
        self.handle(entity)?
            .restore(snapshot)
            .await
            .map_err(|err| SupervisorError::Actor(entity.clone(), err))
    }

    pub async fn snapshot(
        &self,
        entity: &EntityRef,
    ) -> Result<HashMap<String, ArgumentWindow>, SupervisorError> {
        self.handle(entity)?
            .snapshot()
            .await
            .map_err(|err| SupervisorError::Actor(entity.clone(), err))
    }

    pub async fn debug_snapshot(
        &self,
        entity: &EntityRef,
    ) -> Result<Option<DebugPayload>, SupervisorError> {
        self.handle(entity)?
            .debug_snapshot()
            .await
            .map_err(|err| SupervisorError::Actor(entity.clone(), err))
    }

    pub async fn set_debug_mode(
        &self,
        entity: &EntityRef,
        enabled: bool,
    ) -> Result<(), SupervisorError> {
        self.handle(entity)?
            .set_debug_mode(enabled)
            .await
            .map_err(|err| SupervisorError::Actor(entity.clone(), err))
    }

    /// Shuts down every actor and waits for them to finish
    pub async fn shutdown(mut self) {
        info!(
            "[Supervisor] shutting down {} entity actors",
            self.actors.len()
        );
        let stops = self
            .actors
            .drain()
            .map(|(_, (handle, join_handle))| Self::stop(handle, join_handle));
        futures::future::join_all(stops).await;
    }
}

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

//! Windowed aggregation of per-entity telemetry.
//!
//! Argument updates of an entity are partitioned into time buckets. For every
//! bucket and argument the engine decides when a metric must be (re)computed,
//! accepts late data up to a watermark and finalizes each bucket once.
//! Computing the aggregate itself is delegated to a [fetch::MetricFetcher].

pub mod argument;
pub mod config;
pub mod debug;
pub mod engine;
pub mod fetch;
pub mod interval;
pub mod metric;
pub mod status;
pub mod value;
pub mod window;

pub const OTL_ENTITY_ID_KEY: &str = "netgauze.cf.aggregation.entity.id";
pub const OTL_TENANT_ID_KEY: &str = "netgauze.cf.aggregation.tenant.id";

//! Simulation core for the fleet telemetry simulator.
//!
//! This crate owns the in-memory fleet and the two timers that drive it:
//! a fast tick that advances every vehicle and broadcasts the result, and
//! a slow tick that persists snapshots and refreshes the fleet cache.
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `fleet-config.yaml` into
//!   strongly-typed structs.
//! - [`geo`] -- Points, bounding boxes, great-circle bearing.
//! - [`store`] -- [`StateStore`], the per-simulation vehicle map.
//! - [`kinematics`] -- Pure motion and sensor model.
//! - [`alerts`] -- Threshold evaluator and optional cooldown gate.
//! - [`repository`] -- [`FleetRepository`] persistence contract.
//! - [`cache`] -- [`FleetCache`] best-effort cache contract.
//! - [`channel`] -- [`LiveChannel`] live-update contract.
//! - [`memory`] -- In-memory repository and cache.
//! - [`sink`] -- [`BroadcastSink`], fast-tick publish and slow-tick persist.
//! - [`seed`] -- Roster loading with retry.
//! - [`tick`] -- [`Simulation`], one fast pass or slow batch at a time.
//! - [`scheduler`] -- [`Scheduler`], the two repeating timers.
//!
//! [`StateStore`]: store::StateStore
//! [`FleetRepository`]: repository::FleetRepository
//! [`FleetCache`]: cache::FleetCache
//! [`LiveChannel`]: channel::LiveChannel
//! [`BroadcastSink`]: sink::BroadcastSink
//! [`Simulation`]: tick::Simulation
//! [`Scheduler`]: scheduler::Scheduler

pub mod alerts;
pub mod cache;
pub mod channel;
pub mod config;
pub mod geo;
pub mod kinematics;
pub mod memory;
pub mod repository;
pub mod scheduler;
pub mod seed;
pub mod sink;
pub mod store;
pub mod tick;

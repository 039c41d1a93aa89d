//! Coinfolio Core - Domain logic and business rules
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain entities** - `Coin`, `Holding`, `Resource`, `PortfolioSummary`
//! - **Synchronization rules** - the coherence checker and the upsert/merge
//!   reconciliation planner
//! - **Port definitions** - Traits for adapters: `IMarketStore`, `IMarketSource`
//! - **Configuration** - YAML-backed settings shared by every binary
//!
//! # Architecture
//!
//! The domain module contains pure business logic with no I/O. Ports define
//! the trait interfaces that the SQLite cache and the HTTP market client
//! implement. The synchronization engine in `coinfolio-sync` only talks to
//! these ports.

pub mod config;
pub mod domain;
pub mod ports;

//! Puzzle engine, strategies, broadcast hub, and demo orchestration for the
//! Tower of Hanoi AI visualizer.
//!
//! # Modules
//!
//! - [`puzzle`] -- The peg/disk state machine and its state encoding.
//! - [`strategy`] -- [`Strategy`] trait and the optimal [`SolverStrategy`].
//! - [`network`] -- Seeded random-weight policy network strategy.
//! - [`hub`] -- Connection registry with best-effort fan-out.
//! - [`game`] -- Game lifecycle: owns the current puzzle.
//! - [`demo`] -- The single shared demo run and its cancellable step loop.
//! - [`config`] -- Environment-sourced configuration.
//!
//! [`Strategy`]: strategy::Strategy
//! [`SolverStrategy`]: strategy::SolverStrategy

pub mod config;
pub mod demo;
pub mod game;
pub mod hub;
pub mod network;
pub mod puzzle;
pub mod strategy;

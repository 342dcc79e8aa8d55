//! Procedural generation of visual-analogy matrix puzzles over a discrete
//! attribute grammar, together with a rule-based checker that certifies
//! every emitted instance as uniquely solvable.

pub mod aot;
pub mod configs;
pub mod core;
pub mod generator;
pub mod manifest;
pub mod rules;
pub mod sampling;
pub mod solver;

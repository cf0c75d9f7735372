//! Metaphor Experiment: word-by-word reading and meaningfulness judgement.
//!
//! This crate wires the reading kernel to a participant session:
//! - Loads stimulus sets and the built-in practice block
//! - Draws screens and reads keys in the terminal
//! - Appends one CSV row per main-block trial
//! - Summarizes accuracy and latency at the end of a session

pub mod console;
pub mod data_log;
pub mod experiment;
pub mod results;
pub mod screens;
pub mod stimuli;

// HateBlock: incremental hate-speech suppression for live document trees.
//
// This is the library root. Each module corresponds to a subsystem of the
// suppression pipeline or one of the ports it talks to.

pub mod classifier;
pub mod config;
pub mod dom;
pub mod engine;
pub mod filter;
pub mod output;
pub mod settings;
pub mod status;
pub mod storage;

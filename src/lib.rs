pub mod cli;
pub mod color;
pub mod config;
pub mod effects;
pub mod events;
pub mod ledfx;
pub mod pipeline;
pub mod preview;
pub mod sync;

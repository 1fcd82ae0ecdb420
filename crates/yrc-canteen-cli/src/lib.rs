//! Library half of the `yrc-canteen` command: settings resolution and output
//! rendering, kept out of `main.rs` so they can be tested.

pub mod config;
pub mod output;

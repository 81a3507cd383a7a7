//! chaoswave library - body motion to generative sound
//!
//! Frames are reduced to motion metrics, smoothed into a chaos level, mapped
//! to synthesis parameters, and rendered by a real-time oscillator bank.

pub mod audio;
pub mod bus;
pub mod chaos;
pub mod cli;
pub mod error;
pub mod motion;
pub mod params;
pub mod source;

//! Frame timing.
//!
//! - one `FrameClock` per render loop; call `tick()` once per presented frame
//! - `FrameStats` turns the resulting `FrameTime`s into periodic averages

mod frame_clock;
mod frame_stats;

pub use frame_clock::{FrameClock, FrameTime};
pub use frame_stats::{FrameReport, FrameStats};

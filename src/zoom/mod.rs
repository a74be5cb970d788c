pub mod controller;
pub mod options;

pub use controller::{Gesture, Outcome, PendingQuery, ZoomController, ZoomState};
pub use options::{AxisScale, ChartOptions, SeriesOptions};

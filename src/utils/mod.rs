pub mod constants;
pub mod filename;
pub mod progress;
pub mod rounding;
pub mod text;

pub use constants::*;
pub use filename::{current_timestamp, processed_copy_filename};
pub use progress::ProgressReporter;
pub use rounding::{percentage, round_count, round_to};
pub use text::fold_cedillas;

pub mod state;
pub mod well;

pub use state::WellState;
pub use well::{WellRng, STATE_WORDS};

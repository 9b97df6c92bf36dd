pub mod bus;
pub mod filter;
pub mod label;

pub use bus::Subscription;
pub use filter::EventFilter;
pub use label::{EventLabel, EventLabeler};

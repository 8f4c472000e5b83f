//! Priority-lane dispatching.
//!
//! Decides which waiting request is served next: strict priority across
//! lanes, first-come-first-served within a lane.
//!
//! # Usage
//!
//! ```
//! use u_dispense::dispatching::PriorityDispatcher;
//! use u_dispense::models::Priority;
//!
//! let mut dispatcher = PriorityDispatcher::default();
//! dispatcher.push(Priority::Normal.class(), "walk-in").unwrap();
//! dispatcher.push(Priority::Emergency.class(), "trauma").unwrap();
//!
//! assert_eq!(dispatcher.pop_next(), Some((0, "trauma")));
//! assert_eq!(dispatcher.pop_next(), Some((2, "walk-in")));
//! assert_eq!(dispatcher.pop_next(), None);
//! ```

mod dispatcher;
mod lane;

pub use dispatcher::{PriorityDispatcher, DEFAULT_LANE_COUNT};
pub use lane::PriorityLane;

//! Domain types: the schedule codec and the generation inputs

mod input;
mod schedule;

pub use input::TaskInput;
pub use schedule::{ScheduleEntry, ScheduleFormatError, parse_lines, to_lines};

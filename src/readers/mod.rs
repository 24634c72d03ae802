pub mod aggregate_reader;
pub mod presence_reader;

pub use aggregate_reader::{first_timestamp, read_attendance, read_results};
pub use presence_reader::{parse_count, PresenceReader, PresenceSchema, PresenceTable};

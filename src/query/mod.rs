// Query filter compilation: free-form date strings and operator-based
// value filters become precise range predicates.

pub mod datetime;
pub mod value_filter;

pub use datetime::{parse_date_time, DateParseError, TimeRange, SUPPORTED_FORMATS};
pub use value_filter::{compile_value_filter, FilterError, ValueRange};

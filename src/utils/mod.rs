pub mod cleaner;
pub mod data;
pub mod dates;
pub mod grouping;

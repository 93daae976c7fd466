pub mod any;
pub mod fmt;

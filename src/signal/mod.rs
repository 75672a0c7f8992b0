pub mod conditioner;
pub(crate) mod csv_source;
pub(crate) mod filters;
pub(crate) mod mains;
pub mod quality;
pub mod segment;
pub mod window;

pub mod geocode;
pub mod join;
pub mod percentages;

pub mod balance;
pub mod calendar;
pub mod matchup;
pub mod sequence;
pub mod venue;

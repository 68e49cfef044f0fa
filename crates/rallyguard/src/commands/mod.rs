pub mod check;
pub mod purge;
pub mod report;

pub mod list;
pub mod smash;

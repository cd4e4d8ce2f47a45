// Application models persisted through the record store.

pub mod inventory;
pub mod roster;

pub use inventory::Product;
pub use roster::{Gender, Hostel, Person, PersonInfo};

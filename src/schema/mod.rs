pub mod claim;
pub mod decision;
pub mod event;
pub mod line;

pub mod categories;
pub mod classify;
pub mod health;
pub mod model;

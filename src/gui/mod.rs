pub mod application;
pub mod dialog;
pub mod open;
pub mod style;
pub mod types;
pub mod view_model;

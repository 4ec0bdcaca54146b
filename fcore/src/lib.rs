pub mod buf;
pub mod name;

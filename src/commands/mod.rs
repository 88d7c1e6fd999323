pub mod diff;
pub mod generate;
pub mod promote;
pub mod validate;

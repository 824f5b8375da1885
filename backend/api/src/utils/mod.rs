//! Small shared helpers.
pub mod email;
pub mod httperror;
pub mod timestamp;

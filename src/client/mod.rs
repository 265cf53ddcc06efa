//! Submitting side of the inspection API: form state, scanner input and
//! the HTTP submission client.

pub mod form;
pub mod scanner;
pub mod submission;

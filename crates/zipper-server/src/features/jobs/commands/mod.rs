pub mod submit;

pub use submit::{SubmitJobCommand, SubmitJobResponse};

pub mod errors;
pub mod svc;

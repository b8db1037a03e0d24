pub mod extract;
pub mod rank;
pub mod resolve;

pub mod claims;
pub mod errors;
pub mod extractors;
pub mod gate;
pub mod hash_pool;
pub mod jwt;
pub mod password;
pub mod session;
pub mod validation;

pub mod fingerprint;
pub mod password;
pub mod validation;

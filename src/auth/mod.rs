/// Authentication building blocks: credential hashing, token generation,
/// failed-login lockout, and request-level authorization extractors.
pub mod gate;
pub mod lockout;
pub mod password;
pub mod token;

pub mod core;
pub mod resolve;
pub mod permissions;
pub mod router;

// Built-in OS capabilities wired to the policy
pub mod capabilities;

// Optional components
pub mod logging;

pub mod claims;
pub mod settings;
pub mod sso_params;

pub use claims::Claims;
pub use sso_params::SsoParams;

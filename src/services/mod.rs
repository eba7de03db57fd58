pub mod claims_signer;
pub mod factory;
pub mod hex_codec;
pub mod jwt;
pub mod message;
pub mod registry;
pub mod signer;
pub mod sso_request;
pub mod verifier;

pub use claims_signer::ClaimsSigner;
pub use factory::{build_broker_resolver, build_request_builder, build_verifier};
pub use jwt::{JwtTokenCodec, TokenCodec, TokenIssuer};
pub use message::build_message;
pub use registry::{BrokerKeyResolver, Registry, StaticRegistry};
pub use signer::{EthSigner, Signer};
pub use sso_request::SsoRequestBuilder;
pub use verifier::{BrokerCheck, Verdict, Verifier, VerifyRequest};

/// Factory: wire the default collaborators from `SdkConfig`.
use std::sync::Arc;

use crate::config::SdkConfig;
use crate::services::jwt::JwtTokenCodec;
use crate::services::registry::{BrokerKeyResolver, Registry};
use crate::services::signer::EthSigner;
use crate::services::sso_request::SsoRequestBuilder;
use crate::services::verifier::Verifier;

pub fn build_verifier() -> Arc<Verifier> {
    Arc::new(Verifier::new(
        Arc::new(EthSigner::new()),
        Arc::new(JwtTokenCodec::new()),
    ))
}

pub fn build_request_builder() -> Arc<SsoRequestBuilder> {
    Arc::new(SsoRequestBuilder::new(Arc::new(EthSigner::new())))
}

pub fn build_broker_resolver<R: Registry>(registry: R, config: &SdkConfig) -> BrokerKeyResolver<R> {
    BrokerKeyResolver::new(registry, config.registry())
}

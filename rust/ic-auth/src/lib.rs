//! Authentication core: client registry, bearer/signature verifiers,
//! permission matcher, orchestrator, nonce store (C1-C5, C11).

pub mod bearer;
pub mod canonical;
pub mod error;
pub mod nonce;
pub mod orchestrator;
pub mod permission;
pub mod principal;
pub mod registry;
pub mod signature;

pub use bearer::{BearerVerifier, BearerClaimsVerified};
pub use error::{AuthError, AuthResult, BearerError, RegistryError, SignatureError};
pub use nonce::{spawn_janitor, JanitorHandle, NonceStore};
pub use orchestrator::{AuthOrchestrator, PresentedAuth, RequestHeaders};
pub use permission::has as permission_has;
pub use principal::Principal;
pub use registry::{ClientEntry, ClientRegistry, Credential};
pub use signature::SignatureVerifier;

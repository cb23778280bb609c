//! Auth for the Containarium control plane (§4.I): JWT issuance/validation
//! under a process-wide expiry cap, mTLS certificate loading for the gRPC
//! peer-to-peer surface, and the CORS/WebSocket `Origin` allow-list shared
//! by both.

pub mod error;
pub mod jwt;
pub mod mtls;
pub mod origin;

pub use error::SecurityError;
pub use jwt::{Claims, JwtConfig, JwtIssuer, DEFAULT_MAX_TOKEN_EXPIRY_HOURS};
pub use mtls::{load_mtls_material, MtlsMaterial};
pub use origin::OriginAllowList;

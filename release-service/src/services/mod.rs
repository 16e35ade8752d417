pub mod aad;
pub mod blob;
pub mod gateway;
pub mod key_vault;
pub mod message_builder;
pub mod packager;
pub mod product_info;
pub mod signer;

pub use aad::AadTokenClient;
pub use blob::{BlobUploader, HttpBlobUploader};
pub use gateway::{wait_for_completion, GatewayClient, HttpGatewayClient};
pub use key_vault::{CertificateProvider, KeyVaultClient, SecretStore};
pub use message_builder::UploadedFile;
pub use packager::PackagedArchive;
pub use signer::{Rs256Signer, TokenSigner};

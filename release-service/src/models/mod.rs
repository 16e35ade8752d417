pub mod certificate;
pub mod gateway;
pub mod product;
pub mod release;

pub use certificate::{CertificateMaterial, SigningCredentials};
pub use gateway::{
    OperationResponse, ReleaseDetails, ReleaseStatus, SessionRequest, SessionResponse,
};
pub use product::{BuildSystem, ProductInfo};
pub use release::{
    AccessPermissionsInfo, ApproverInfo, FileLocation, HashType, OwnerInfo, ReleaseFileInfo,
    ReleaseInfo, ReleaseProperties, ReleaseRequestMessage, RoutingInfo, SourceLocationType,
    UserInfo, LOCATION_TYPE_UNC,
};

pub mod digest;
pub mod list;

pub use digest::sha256_base64;
pub use list::{LIST_DELIMITER, split_list};

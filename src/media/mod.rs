pub mod assets;
pub mod store;

pub use self::assets::{ImageOwner, UploadMeta};
pub use self::store::{MediaStore, ObjectInfo, StoredObject};

pub mod article;
pub mod entity;

pub use article::{Article, ArticleItem, Marker};
pub use entity::{ContentDescriptor, EntityType, FileType, Metadata, Transform, TRASH_PARENT};

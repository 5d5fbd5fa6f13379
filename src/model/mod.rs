//! Data models for postsync.
//!
//! - `ContentRecord` / `NewPost` / `PostPatch` - the local post store
//! - `RemotePost` / `NewRemotePost` / `CreatedPost` - the publishing target
//! - `PostStatus` / `Visibility` - the two status vocabularies being reconciled

pub mod post;

pub use post::{
    ContentRecord, CreatedPost, FALLBACK_CATEGORY, NewPost, NewRemotePost, PostFilter, PostPatch,
    PostStatus, RemotePost, Visibility,
};

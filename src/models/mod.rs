//! Data models
//!
//! This module contains all data structures used throughout the Devshare
//! platform. Models represent:
//! - Database entities (User, Item, Comment, Tag, Favorite, Session)
//! - Input types passed from the API layer into the services

mod comment;
mod favorite;
mod item;
mod session;
mod tag;
mod user;

pub use comment::{Comment, CommentView, CommentWithAuthor, CreateCommentInput};
pub use favorite::Favorite;
pub use item::{CreateItemInput, Item, ItemDetail, ItemKind, UpdateItemInput};
pub use session::Session;
pub use tag::Tag;
pub use user::{ApprovalStatus, UpdateProfileInput, User, UserRole};

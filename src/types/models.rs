pub mod dependency;
pub mod developer;
pub mod mod_entity;
pub mod mod_update;
pub mod mod_version;
pub mod platform;
pub mod tag;
pub mod timestamp;

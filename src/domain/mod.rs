pub mod ai;
pub mod entity;
pub mod layout;
pub mod note;
pub mod physics;
pub mod rules;

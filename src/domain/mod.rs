//! Domain layer: entities, repository traits, access policy, and the click
//! retry pipeline.

pub mod click_event;
pub mod click_worker;
pub mod entities;
pub mod policy;
pub mod repositories;

#![allow(unused_crate_dependencies)]

#[path = "integration/common/mod.rs"]
mod common;

#[path = "integration/dispatch.rs"]
mod dispatch;

#[path = "integration/invalidation.rs"]
mod invalidation;

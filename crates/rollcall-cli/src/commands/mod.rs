//! CLI command implementations

pub(crate) mod common;
pub(crate) mod new;
pub(crate) mod pending;
pub(crate) mod run;
pub(crate) mod status;
pub(crate) mod unlock;

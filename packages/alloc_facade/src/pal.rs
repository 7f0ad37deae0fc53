//! Platform abstraction layer for the facade.
//!
//! Everything the facade needs from the operating environment (the raw C heap and the crash
//! collaborator) goes through the [`Platform`] trait so that tests can substitute a fake heap that
//! hands out deliberately misaligned blocks and a crash path that panics instead of aborting.

mod abstractions;
mod facade;
#[cfg(test)]
mod fake;
mod real;

pub(crate) use abstractions::Platform;
pub(crate) use facade::PlatformFacade;
#[cfg(test)]
pub(crate) use fake::FakePlatform;
pub(crate) use real::BuildTargetPlatform;

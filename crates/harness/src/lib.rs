pub mod fixture;
pub mod matcher;
pub mod runner;

pub use fixture::{Fixture, load_fixture};
pub use runner::{Failure, FixtureResult, run_fixture};

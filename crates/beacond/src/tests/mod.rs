//! Test suites for the beacon daemon.

mod process_behaviour;

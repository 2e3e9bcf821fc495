//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises the controller end to end
//! against a mock or simulated board.  All tests run on the host with no
//! real hardware required.

mod mock_hw;
mod orchestrator_tests;

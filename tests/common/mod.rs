//! Shared helpers for integration tests.

#![allow(dead_code)]

pub use tracemode::test_utils::init_test_logging;

macro_rules! test_phase {
    ($name:expr) => {
        tracing::info!(test = %$name, "test phase start");
    };
}

macro_rules! test_complete {
    ($name:expr) => {
        tracing::info!(test = %$name, "test phase complete");
    };
}

macro_rules! assert_with_log {
    ($cond:expr, $msg:expr, $expected:expr, $actual:expr) => {{
        let ok = $cond;
        if !ok {
            tracing::error!(expected = ?$expected, actual = ?$actual, "{}", $msg);
        }
        assert!(ok, "{}: expected {:?}, got {:?}", $msg, $expected, $actual);
    }};
}

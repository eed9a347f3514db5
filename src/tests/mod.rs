//! Cross-module test support and pipeline tests.

pub(crate) mod support;

mod integration_tests;

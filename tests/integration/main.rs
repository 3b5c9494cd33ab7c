//! Integration tests for the harvester
//!
//! These tests use wiremock to serve repository and case pages and drive
//! the HTTP browser, the coordinator and the SQLite store end-to-end.

mod browser_tests;
mod pipeline_tests;
mod support;

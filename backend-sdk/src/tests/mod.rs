//! Mock-server tests for the backend clients

pub mod local_mock_tests;
pub mod search_mock_tests;

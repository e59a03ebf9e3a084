//! Integration and property tests for the cred engine live under `tests/`.

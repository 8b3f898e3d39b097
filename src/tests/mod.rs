//! Consolidated end-to-end tests for the cleanup engine.

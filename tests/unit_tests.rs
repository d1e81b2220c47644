//! Unit-level tests for the public API surface, grouped by component.

mod unit;

//! Property-based tests for binding determinism and ledger invariants

mod determinism;

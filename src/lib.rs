/// Account balance rules. Balance changes are expressed as events, which are
/// produced by handling validated commands and then applied.
pub mod account;

/// Validated account commands that later are executed by [`account`].
pub mod command;

/// People registry entries and their validation.
pub mod person;

/// Ledger engine and directory interfaces, plus the "in memory" and SQLite
/// implementations. Every balance mutation and its transaction row are
/// written together or not at all.
pub mod processor;

/// SQLite connection setup and schema bootstrap.
pub mod store;

/// Interactive menu and CSV import used by the binary. It lives in the library
/// so the integration tests can drive a full session.
pub mod bin_utils;

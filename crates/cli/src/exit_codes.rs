//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! | Code | Description                                           |
//! |------|-------------------------------------------------------|
//! | 0    | Success                                               |
//! | 1    | General error (unspecified)                           |
//! | 2    | Usage or input error (bad args, unreadable/bad file)  |
//! | 3    | Merge conflict                                        |
//! | 4    | Schema violation                                      |
//! | 5    | Equivalence check failed (`prove`)                    |
//! | 6    | Settings or schema configuration error                |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing or unreadable input, malformed JSON.
pub const EXIT_USAGE: u8 = 2;

/// Two sources asserted different values for one field of one entity.
pub const EXIT_MERGE_CONFLICT: u8 = 3;

/// A unified record does not match the schema.
pub const EXIT_SCHEMA_VIOLATION: u8 = 4;

/// At least one commutativity, idempotency or associativity check failed.
pub const EXIT_PROOF_FAILED: u8 = 5;

/// Settings file or schema file is invalid.
pub const EXIT_CONFIG: u8 = 6;

//! Scope vocabulary.
//!
//! The gateway extracts scopes, it does not enforce them. Downstream
//! handlers make their own authorization decisions against the scope set
//! carried by the authenticated identity; this module keeps the names they
//! agree on in one place.

/// Read access to learning record statements.
pub const STATEMENTS_READ: &str = "statements/read";

/// Write access to learning record statements.
pub const STATEMENTS_WRITE: &str = "statements/write";

/// Read access restricted to the caller's own statements.
pub const STATEMENTS_READ_MINE: &str = "statements/read/mine";

/// Read access to activity state documents.
pub const STATE_READ: &str = "state/read";

/// Write access to activity state documents.
pub const STATE_WRITE: &str = "state/write";

/// Full administrative access.
pub const ADMIN: &str = "admin";

/// Administrative access within the caller's tenant.
pub const TENANT_ADMIN: &str = "tenant/admin";

/// Every scope the platform recognizes.
pub const ALL_SCOPES: &[&str] = &[
    STATEMENTS_READ,
    STATEMENTS_WRITE,
    STATEMENTS_READ_MINE,
    STATE_READ,
    STATE_WRITE,
    ADMIN,
    TENANT_ADMIN,
];

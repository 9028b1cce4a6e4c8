//! Rich diagnostic error types for the classification bridge.
//!
//! Each phase of the pipeline defines its own error type with miette
//! `#[diagnostic]` derives, providing error codes, help text, and source
//! chains. Fatal errors carry the failing concept/relationship identifiers so
//! a run failure can be reproduced from the log alone.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for the bridge.
///
/// Each variant wraps a phase-specific error, preserving the full diagnostic
/// chain (error codes, help text, sources) through to the caller.
#[derive(Debug, Error, Diagnostic)]
pub enum BridgeError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Alloc(#[from] AllocError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Reconcile(#[from] ReconcileError),
}

// ---------------------------------------------------------------------------
// Configuration errors (pre-flight, fatal)
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("role count {count} exceeds the configured maximum of {max}")]
    #[diagnostic(
        code(onto::config::role_limit),
        help(
            "Engine memory use scales sharply with role count. Either narrow the \
             role-root concept so fewer relationship types qualify as roles, or \
             raise `max_roles` if the engine deployment can take it."
        )
    )]
    RoleLimit { count: usize, max: usize },

    #[error("configured {which} concept {id} is not in scope on this path")]
    #[diagnostic(
        code(onto::config::concept_not_in_scope),
        help(
            "The root, IS-A, and role-root concepts must all be visible on the \
             path being classified. Check the path id and the configured \
             identifiers."
        )
    )]
    ConceptNotInScope { which: &'static str, id: u64 },

    #[error("invalid configuration: {message}")]
    #[diagnostic(
        code(onto::config::invalid),
        help("Check the run configuration fields. {message}")
    )]
    Invalid { message: String },

    #[error("failed to parse run configuration: {source}")]
    #[diagnostic(
        code(onto::config::parse),
        help("The configuration file must be TOML with `root`, `isa` and `role_root` set.")
    )]
    Parse {
        #[source]
        source: toml::de::Error,
    },
}

// ---------------------------------------------------------------------------
// Allocation errors (pre-flight, fatal)
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum AllocError {
    #[error("external identifier {id} collides with a reserved sentinel value")]
    #[diagnostic(
        code(onto::alloc::sentinel_collision),
        help(
            "The maximum u64 value is reserved to pad the engine's concept array. \
             A store identifier with this value cannot be classified; fix the \
             offending concept in the store."
        )
    )]
    SentinelCollision { id: u64 },

    #[error("duplicate external identifier {id} in the concept stream")]
    #[diagnostic(
        code(onto::alloc::duplicate),
        help(
            "Handle assignment must be injective. The same concept was yielded \
             twice by the source iterator; check the path filter in the store."
        )
    )]
    Duplicate { id: u64 },

    #[error("handle space exhausted: {count} concepts exceed the dense handle range")]
    #[diagnostic(
        code(onto::alloc::exhausted),
        help(
            "The dense handle space is 32-bit minus the reserved sentinels. \
             This limit is far above any real terminology; if you see this, \
             the source iterator is likely looping."
        )
    )]
    Exhausted { count: usize },
}

// ---------------------------------------------------------------------------
// Encoding errors (pre-flight, fatal)
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum EncodeError {
    #[error(
        "relationship {rel_id} on concept {source_id} references out-of-scope concept {missing} \
         (type {typ}, destination {destination})"
    )]
    #[diagnostic(
        code(onto::encode::out_of_scope),
        help(
            "Every concept a stated relationship names must itself be on the \
             classified path. The store snapshot is internally inconsistent; \
             re-run the path integrity checks."
        )
    )]
    OutOfScope {
        rel_id: u64,
        source_id: u64,
        typ: u64,
        destination: u64,
        missing: u64,
    },
}

// ---------------------------------------------------------------------------
// Engine errors (mid-run, fatal)
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum EngineError {
    #[error("classification engine failed during {phase}: {message}")]
    #[diagnostic(
        code(onto::engine::failed),
        help(
            "The engine is a black box to the bridge; no partial result is \
             honored. The run ends failed and no change set is produced."
        )
    )]
    Failed { phase: &'static str, message: String },
}

// ---------------------------------------------------------------------------
// Store errors (recoverable at the caller's discretion)
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    #[error("store read failed while collecting concepts: {message}")]
    #[diagnostic(
        code(onto::store::read),
        help(
            "The run aborted cleanly; nothing was written. Retry once the \
             store is reachable again."
        )
    )]
    Read { message: String },

    #[error("I/O error: {source}")]
    #[diagnostic(
        code(onto::store::io),
        help("Check that the target location exists and is writable.")
    )]
    Io {
        #[source]
        source: std::io::Error,
    },
}

impl From<std::io::Error> for StoreError {
    fn from(source: std::io::Error) -> Self {
        StoreError::Io { source }
    }
}

// ---------------------------------------------------------------------------
// Reconciliation errors (fatal)
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ReconcileError {
    #[error("engine output references unknown handle {handle}")]
    #[diagnostic(
        code(onto::reconcile::unknown_handle),
        help(
            "Every handle in the engine's result must decode through the run's \
             handle table. An unknown handle means the engine and the bridge \
             disagree about the submitted ontology; the run cannot be trusted."
        )
    )]
    UnknownHandle { handle: u32 },

    #[error("engine output references reserved sentinel handle {handle}")]
    #[diagnostic(
        code(onto::reconcile::sentinel_in_result),
        help(
            "TOP, BOTTOM and the padding value must never appear in normalized \
             relationships or equivalence groups. This indicates inconsistent \
             engine output; the run is discarded."
        )
    )]
    SentinelInResult { handle: u32 },

    #[error("equivalence group of size {size} reported; groups must have at least 2 members")]
    #[diagnostic(
        code(onto::reconcile::degenerate_group),
        help("A singleton or empty equivalence group is inconsistent engine output.")
    )]
    DegenerateGroup { size: usize },
}

/// Convenience alias for functions returning bridge results.
pub type BridgeResult<T> = std::result::Result<T, BridgeError>;

//! The classification engine contract.
//!
//! The actual subsumption algorithm is an opaque external service; the bridge
//! only ever talks to it through [`ClassificationEngine`]: configure, load
//! axioms, one blocking classify call, then drain two callback channels. Any
//! engine failure is fatal for the run and no partial result is honored.
//!
//! [`StubEngine`] is a canned double that replays programmed results, so the
//! encoder and reconciler can be exercised without a real reasoner.

use crate::concept::{Handle, InferredAxiom};
use crate::encode::EncodedOntology;
use crate::error::BridgeResult;

/// Three-call contract plus two result channels.
///
/// Call order is fixed: `configure`, `load_axioms`, `classify`, then the two
/// `for_each_*` drains. Callbacks fire once per fact in implementation-defined
/// order; callers must not depend on ordering. Engine-internal parallelism,
/// if any, is opaque and uncontrolled.
pub trait ClassificationEngine {
    /// Set the scope root, the IS-A role handle, and the role-root handle.
    fn configure(&mut self, root: Handle, isa: Handle, role_root: Handle) -> BridgeResult<()>;

    /// Load the encoded concept array, role array, relationship triples, and
    /// defined set. The ontology is passed by ownership; the engine keeps it
    /// for the duration of classification.
    fn load_axioms(&mut self, ontology: EncodedOntology) -> BridgeResult<()>;

    /// Run classification. Blocks until complete; not cancellable.
    fn classify(&mut self) -> BridgeResult<()>;

    /// Invoke `f` once per equivalence group found during classification.
    fn for_each_equivalence_group(
        &mut self,
        f: &mut dyn FnMut(&[Handle]) -> BridgeResult<()>,
    ) -> BridgeResult<()>;

    /// Invoke `f` once per normalized ("distribution form") relationship.
    fn for_each_inferred_relationship(
        &mut self,
        f: &mut dyn FnMut(&InferredAxiom) -> BridgeResult<()>,
    ) -> BridgeResult<()>;
}

/// Canned engine double replaying programmed results.
///
/// Records whether it was invoked at all, which the cancellation tests rely
/// on: a run cancelled during collection must never reach the engine.
#[derive(Debug, Default)]
pub struct StubEngine {
    /// Equivalence groups to replay, in handle space.
    pub equivalences: Vec<Vec<Handle>>,
    /// Normalized relationships to replay.
    pub inferred: Vec<InferredAxiom>,
    /// Set once `configure` is called.
    pub configured: Option<(Handle, Handle, Handle)>,
    /// The ontology received by `load_axioms`.
    pub loaded: Option<EncodedOntology>,
    /// Whether `classify` ran.
    pub classified: bool,
}

impl StubEngine {
    /// A stub that classifies successfully and reports nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Program the normalized relationships the stub will report.
    pub fn with_inferred(mut self, inferred: Vec<InferredAxiom>) -> Self {
        self.inferred = inferred;
        self
    }

    /// Program the equivalence groups the stub will report.
    pub fn with_equivalences(mut self, groups: Vec<Vec<Handle>>) -> Self {
        self.equivalences = groups;
        self
    }

    /// Whether any of the engine contract calls were made.
    pub fn was_invoked(&self) -> bool {
        self.configured.is_some() || self.loaded.is_some() || self.classified
    }
}

impl ClassificationEngine for StubEngine {
    fn configure(&mut self, root: Handle, isa: Handle, role_root: Handle) -> BridgeResult<()> {
        self.configured = Some((root, isa, role_root));
        Ok(())
    }

    fn load_axioms(&mut self, ontology: EncodedOntology) -> BridgeResult<()> {
        self.loaded = Some(ontology);
        Ok(())
    }

    fn classify(&mut self) -> BridgeResult<()> {
        self.classified = true;
        Ok(())
    }

    fn for_each_equivalence_group(
        &mut self,
        f: &mut dyn FnMut(&[Handle]) -> BridgeResult<()>,
    ) -> BridgeResult<()> {
        for group in &self.equivalences {
            f(group)?;
        }
        Ok(())
    }

    fn for_each_inferred_relationship(
        &mut self,
        f: &mut dyn FnMut(&InferredAxiom) -> BridgeResult<()>,
    ) -> BridgeResult<()> {
        for axiom in &self.inferred {
            f(axiom)?;
        }
        Ok(())
    }
}

/// Engine double that fails during `classify`, for failure-path tests.
#[derive(Debug, Default)]
pub struct FailingEngine;

impl ClassificationEngine for FailingEngine {
    fn configure(&mut self, _: Handle, _: Handle, _: Handle) -> BridgeResult<()> {
        Ok(())
    }

    fn load_axioms(&mut self, _: EncodedOntology) -> BridgeResult<()> {
        Ok(())
    }

    fn classify(&mut self) -> BridgeResult<()> {
        Err(crate::error::EngineError::Failed {
            phase: "classify",
            message: "saturation queue overflow".into(),
        }
        .into())
    }

    fn for_each_equivalence_group(
        &mut self,
        _: &mut dyn FnMut(&[Handle]) -> BridgeResult<()>,
    ) -> BridgeResult<()> {
        Ok(())
    }

    fn for_each_inferred_relationship(
        &mut self,
        _: &mut dyn FnMut(&InferredAxiom) -> BridgeResult<()>,
    ) -> BridgeResult<()> {
        Ok(())
    }
}

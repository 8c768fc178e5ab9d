use crate::error::Error;
use crate::spec::AgentSpec;

/// Outcome of a would-be materialization check (spec §4.13).
#[derive(Debug, Clone)]
pub struct MaterializeValidation {
    pub errors: Vec<String>,
}

impl MaterializeValidation {
    pub fn ok() -> Self {
        Self { errors: Vec::new() }
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Rendering a spec to a human-readable text file for a downstream CLI
/// host is outside the core (spec §1). This trait is the thin contract the
/// core relies on: deterministic, idempotent, validated before any
/// filesystem write. The core ships no implementation — only this
/// interface and the guarantees a caller-supplied implementation must
/// uphold.
pub trait Materializer {
    /// Checks required sections, known tool names, known model name
    /// without touching the filesystem. Must be called (and must pass)
    /// before `render`/`write`.
    fn validate(&self, spec: &AgentSpec) -> MaterializeValidation;

    /// Pure, deterministic rendering: same `spec` in, byte-identical
    /// bytes out. No timestamps, no process-specific data.
    fn render(&self, spec: &AgentSpec) -> Result<Vec<u8>, Error>;

    /// Idempotent write: overwrites in place, no backup files. Must call
    /// `validate` first and return its failure without writing.
    fn write(&self, spec: &AgentSpec, path: &std::path::Path) -> Result<(), Error> {
        let validation = self.validate(spec);
        if !validation.is_valid() {
            return Err(Error::SpecValidation(validation.errors.join("; ")));
        }
        let bytes = self.render(spec)?;
        std::fs::write(path, bytes)?;
        Ok(())
    }
}

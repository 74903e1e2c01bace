//! Binary checkpointing.
//!
//! Layout (little-endian, no framing): a 32-byte configuration digest,
//! the per-process coefficients (the mutable per-element substate, so
//! rate-constant rebinds survive a round-trip), then `t_now`, `rtol`,
//! `max_steps` (u32), the absolute-tolerance vector and the state vector.
//! Every section length is determined by the configuration, which is why
//! the identity digest is checked before anything else is read.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use mk_model::Model;
use mk_state::LayoutDims;
use sha2::{Digest, Sha256};

use crate::engine::Engine;
use crate::error::{EngineError, EngineResult};

/// Content digest of the model definition plus the resolved layout
/// dimensions; two engines with equal digests have identical state-vector
/// and process-graph shapes.
pub(crate) fn config_digest(model: &Model, dims: &LayoutDims) -> [u8; 32] {
    let mut hasher = Sha256::new();

    let model_json = serde_json::to_string(model).unwrap_or_default();
    hasher.update(model_json.as_bytes());

    let dims_json = serde_json::to_string(dims).unwrap_or_default();
    hasher.update(dims_json.as_bytes());

    hasher.finalize().into()
}

impl Engine {
    /// Write the full mutable state to `path`.
    pub fn checkpoint(&self, path: impl AsRef<Path>) -> EngineResult<()> {
        let mut w = BufWriter::new(File::create(path)?);

        let digest = config_digest(self.model(), &self.statedef().layout_dims());
        w.write_all(&digest)?;

        for c in self.graph().coefficients() {
            w.write_all(&c.to_le_bytes())?;
        }

        let (t_now, rtol, max_steps) = self.checkpoint_scalars();
        w.write_all(&t_now.to_le_bytes())?;
        w.write_all(&rtol.to_le_bytes())?;
        w.write_all(&max_steps.to_le_bytes())?;

        for &a in self.abstol() {
            w.write_all(&a.to_le_bytes())?;
        }
        for &v in self.state() {
            w.write_all(&v.to_le_bytes())?;
        }

        w.flush()?;
        Ok(())
    }

    /// Restore the state written by [`checkpoint`](Self::checkpoint).
    ///
    /// Fails with `CheckpointMismatch` when the file was written by a
    /// differently configured engine; nothing is modified in that case.
    /// On success the integrator is marked for reinitialisation.
    pub fn restore(&mut self, path: impl AsRef<Path>) -> EngineResult<()> {
        let mut r = BufReader::new(File::open(path)?);

        let mut digest = [0u8; 32];
        r.read_exact(&mut digest)?;
        let expected = config_digest(self.model(), &self.statedef().layout_dims());
        if digest != expected {
            return Err(EngineError::CheckpointMismatch {
                what: "configuration digest differs from the running engine".into(),
            });
        }

        let n_procs = self.graph().n_procs();
        let mut ccsts = vec![0.0; n_procs];
        for c in &mut ccsts {
            *c = read_f64(&mut r)?;
        }

        let t_now = read_f64(&mut r)?;
        let rtol = read_f64(&mut r)?;
        let max_steps = read_u32(&mut r)?;

        let n = self.n_slots();
        let mut abstol = vec![0.0; n];
        for a in &mut abstol {
            *a = read_f64(&mut r)?;
        }
        let mut y = vec![0.0; n];
        for v in &mut y {
            *v = read_f64(&mut r)?;
        }

        self.graph_mut().set_coefficients(&ccsts);
        self.restore_state(t_now, rtol, max_steps, abstol, y);
        Ok(())
    }
}

fn read_f64<R: Read>(r: &mut R) -> std::io::Result<f64> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(f64::from_le_bytes(buf))
}

fn read_u32<R: Read>(r: &mut R) -> std::io::Result<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

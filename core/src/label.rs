//! Label allocation and relocation-patching for forward/backward branches.
//! `spec.md` §4.5.
//!
//! Grounded on the teacher's `delabel` pass, which resolves symbolic jump
//! targets into relative offsets in a second pass over the emitted
//! instruction stream. Here the two passes are `create`/`define`/`add_reloc`
//! during code generation, and a single `resolve` call once generation is
//! complete.

use std::convert::TryFrom;

use crate::consts::{MAX_LABELS, MAX_RELOCATIONS};
use crate::emit::EmitBuffer;
use crate::error::CompileError;

/// What a [Relocation] patches at its `byte_offset` once its target label is
/// known.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RelocKind {
    /// A 4-byte signed offset relative to the end of the relocation site,
    /// i.e. `target - (byte_offset + 4)`. Used by branch/call instructions.
    Branch,
    /// An 8-byte absolute little-endian address. Used where an instruction
    /// embeds a full code address rather than a displacement.
    Absolute,
}

#[derive(Copy, Clone, Debug)]
struct Relocation {
    byte_offset: usize,
    target_label_id: u32,
    kind: RelocKind,
}

/// Allocates label ids, records where each is eventually defined, and
/// remembers every site that referenced one before resolving them all into
/// patched bytes.
#[derive(Default)]
pub struct LabelManager {
    /// `positions[id]` is `None` until the label has been defined.
    positions: Vec<Option<usize>>,
    relocations: Vec<Relocation>,
}

impl LabelManager {
    pub fn new() -> Self {
        Self {
            positions: Vec::new(),
            relocations: Vec::new(),
        }
    }

    /// Allocate a fresh, as-yet-undefined label id.
    pub fn create(&mut self) -> Result<u32, CompileError> {
        if self.positions.len() >= MAX_LABELS {
            return Err(CompileError::LabelOutOfRange {
                id: self.positions.len() as u32,
            });
        }
        let id = self.positions.len() as u32;
        self.positions.push(None);
        Ok(id)
    }

    /// Bind a label id to a byte position in the code stream, normally
    /// `buf.size()` at the point the label is reached during generation.
    pub fn define(&mut self, id: u32, position: usize) -> Result<(), CompileError> {
        let slot = self
            .positions
            .get_mut(id as usize)
            .ok_or(CompileError::LabelOutOfRange { id })?;
        *slot = Some(position);
        Ok(())
    }

    /// Record that the bytes at `byte_offset` need to be patched once
    /// `target_label_id` is defined.
    pub fn add_reloc(
        &mut self,
        byte_offset: usize,
        target_label_id: u32,
        kind: RelocKind,
    ) -> Result<(), CompileError> {
        if self.relocations.len() >= MAX_RELOCATIONS {
            return Err(CompileError::LabelOutOfRange {
                id: target_label_id,
            });
        }
        self.relocations.push(Relocation {
            byte_offset,
            target_label_id,
            kind,
        });
        Ok(())
    }

    /// Patch every recorded relocation into `buf`. Fails fatally (`spec.md`
    /// §7) if any referenced label was never defined.
    pub fn resolve(&self, buf: &mut EmitBuffer) -> Result<(), CompileError> {
        for reloc in &self.relocations {
            let target = self
                .positions
                .get(reloc.target_label_id as usize)
                .and_then(|p| *p)
                .ok_or(CompileError::UndefinedLabel {
                    id: reloc.target_label_id,
                })?;

            match reloc.kind {
                RelocKind::Branch => {
                    let rel = target as i64 - (reloc.byte_offset as i64 + 4);
                    let rel =
                        i32::try_from(rel).map_err(|_| CompileError::LabelOutOfRange {
                            id: reloc.target_label_id,
                        })?;
                    buf.patch(reloc.byte_offset, &rel.to_le_bytes());
                }
                RelocKind::Absolute => {
                    buf.patch(reloc.byte_offset, &(target as u64).to_le_bytes());
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_branch_reloc_relative_offset() {
        let mut labels = LabelManager::new();
        let mut buf = EmitBuffer::new();

        let target = labels.create().unwrap();
        buf.i32(0); // placeholder at offset 0
        labels
            .add_reloc(0, target, RelocKind::Branch)
            .unwrap();
        buf.byte(0xaa); // some instruction bytes after the relocation site
        buf.byte(0xbb);
        labels.define(target, buf.size()).unwrap();

        labels.resolve(&mut buf).unwrap();
        // target is at offset 6, reloc site's end is at offset 4.
        assert_eq!(buf.read_i32_at(0), 2);
    }

    #[test]
    fn test_absolute_reloc() {
        let mut labels = LabelManager::new();
        let mut buf = EmitBuffer::new();
        let target = labels.create().unwrap();
        buf.u64(0);
        labels.add_reloc(0, target, RelocKind::Absolute).unwrap();
        labels.define(target, 0x1234).unwrap();
        labels.resolve(&mut buf).unwrap();
        assert_eq!(buf.read_u64_at(0), 0x1234);
    }

    #[test]
    fn test_undefined_label_is_fatal() {
        let mut labels = LabelManager::new();
        let mut buf = EmitBuffer::new();
        let target = labels.create().unwrap();
        buf.i32(0);
        labels.add_reloc(0, target, RelocKind::Branch).unwrap();
        assert!(matches!(
            labels.resolve(&mut buf),
            Err(CompileError::UndefinedLabel { .. })
        ));
    }

    #[test]
    fn test_backward_branch_negative_offset() {
        let mut labels = LabelManager::new();
        let mut buf = EmitBuffer::new();
        let target = labels.create().unwrap();
        labels.define(target, 0).unwrap();
        buf.byte(0); // 4 bytes of padding before the reloc site
        buf.byte(0);
        buf.byte(0);
        buf.byte(0);
        let reloc_site = buf.size();
        buf.i32(0);
        labels
            .add_reloc(reloc_site, target, RelocKind::Branch)
            .unwrap();
        labels.resolve(&mut buf).unwrap();
        assert_eq!(buf.read_i32_at(reloc_site), -8);
    }
}

//! Multi-slot stimulus patterns and their assembly.
//!
//! A trial stimulus is a [`Pattern`]: a fixed [`PatternLayout`] of named
//! slots (cue, target, context channels), each filled by one feature vector
//! drawn from a pool or a drift chain. Patterns carry two views:
//!
//! - the **input** view (cue + blank target placeholder + context) clamps the
//!   network at trial start;
//! - the **target** view (cue + target + context) is the supervised
//!   comparison standard.
//!
//! Patterns are created at dataset-build time and are read-only during trial
//! execution. [`PatternSet`]s are ordered; set order determines which drift
//! chain segment a trial consumes. The active set for each epoch is resolved
//! once, before the run, by a [`CurriculumSchedule`] — never re-pointed
//! mid-run.

use crate::drift::DriftChain;
use crate::error::{ReverieError, Result};
use crate::vector::FeatureVector;
use std::ops::Range;
use std::sync::Arc;

/// The role a slot plays in the trial protocol.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotRole {
    /// The stimulus to be completed; externally supplied in every view.
    Cue,
    /// The association to be recalled; blank in the input view.
    Target,
    /// A temporal-context channel stamping the item's position in time.
    Context,
}

/// One named slot of a pattern layout.
#[derive(Clone, Debug)]
pub struct SlotSpec {
    pub name: String,
    pub role: SlotRole,
    pub width: usize,
}

/// An ordered, fixed arrangement of slots.
///
/// The layout defines the network's required input/output shape: slot
/// offsets are concatenation offsets into the flat unit vector.
#[derive(Clone, Debug)]
pub struct PatternLayout {
    slots: Vec<SlotSpec>,
    offsets: Vec<usize>,
    width: usize,
}

impl PatternLayout {
    pub fn new(slots: Vec<SlotSpec>) -> Self {
        let mut offsets = Vec::with_capacity(slots.len());
        let mut width = 0usize;
        for slot in &slots {
            offsets.push(width);
            width += slot.width;
        }
        Self {
            slots,
            offsets,
            width,
        }
    }

    /// The canonical layout: one cue slot, one target slot, and
    /// `context_channels` context slots, all of `slot_width` components.
    pub fn standard(slot_width: usize, context_channels: usize) -> Self {
        let mut slots = vec![
            SlotSpec {
                name: "cue".to_string(),
                role: SlotRole::Cue,
                width: slot_width,
            },
            SlotSpec {
                name: "target".to_string(),
                role: SlotRole::Target,
                width: slot_width,
            },
        ];
        for k in 0..context_channels {
            slots.push(SlotSpec {
                name: format!("context{}", k),
                role: SlotRole::Context,
                width: slot_width,
            });
        }
        Self::new(slots)
    }

    /// Total width across all slots.
    pub fn width(&self) -> usize {
        self.width
    }

    /// All slots, in layout order.
    pub fn slots(&self) -> &[SlotSpec] {
        &self.slots
    }

    /// Look up a slot and its concatenation offset by name.
    pub fn slot(&self, name: &str) -> Result<(&SlotSpec, usize)> {
        self.slots
            .iter()
            .position(|s| s.name == name)
            .map(|i| (&self.slots[i], self.offsets[i]))
            .ok_or_else(|| ReverieError::UnknownSlot(name.to_string()))
    }

    /// Names of slots with the given role, in layout order.
    pub fn names_with_role(&self, role: SlotRole) -> Vec<&str> {
        self.slots
            .iter()
            .filter(|s| s.role == role)
            .map(|s| s.name.as_str())
            .collect()
    }

    /// Names of all slots except those with the given role.
    pub fn names_without_role(&self, role: SlotRole) -> Vec<&str> {
        self.slots
            .iter()
            .filter(|s| s.role != role)
            .map(|s| s.name.as_str())
            .collect()
    }
}

/// One trial's full stimulus: a layout plus one fill per slot.
#[derive(Clone, Debug)]
pub struct Pattern {
    name: String,
    layout: Arc<PatternLayout>,
    fills: Vec<FeatureVector>,
}

impl Pattern {
    /// Create a pattern; every slot must be filled with a vector of the
    /// slot's width.
    pub fn new(
        layout: Arc<PatternLayout>,
        name: impl Into<String>,
        fills: Vec<FeatureVector>,
    ) -> Result<Self> {
        if fills.len() != layout.slots.len() {
            return Err(ReverieError::ShapeMismatch {
                expected: layout.slots.len(),
                got: fills.len(),
            });
        }
        for (slot, fill) in layout.slots.iter().zip(fills.iter()) {
            if fill.dimensions() != slot.width {
                return Err(ReverieError::ShapeMismatch {
                    expected: slot.width,
                    got: fill.dimensions(),
                });
            }
        }
        Ok(Self {
            name: name.into(),
            layout,
            fills,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn layout(&self) -> &Arc<PatternLayout> {
        &self.layout
    }

    /// The fill vector of a named slot.
    pub fn fill(&self, slot_name: &str) -> Result<&FeatureVector> {
        let idx = self
            .layout
            .slots
            .iter()
            .position(|s| s.name == slot_name)
            .ok_or_else(|| ReverieError::UnknownSlot(slot_name.to_string()))?;
        Ok(&self.fills[idx])
    }

    fn units(&self, include_target: bool) -> Vec<f64> {
        let mut out = vec![0.0; self.layout.width];
        for ((slot, &offset), fill) in self
            .layout
            .slots
            .iter()
            .zip(self.layout.offsets.iter())
            .zip(self.fills.iter())
        {
            if slot.role == SlotRole::Target && !include_target {
                continue;
            }
            for (i, &v) in fill.data().iter().enumerate() {
                out[offset + i] = v as f64;
            }
        }
        out
    }

    /// The input view: cue + context, target slots blank.
    pub fn input_units(&self) -> Vec<f64> {
        self.units(false)
    }

    /// The target view: all slots, including the association to be recalled.
    pub fn target_units(&self) -> Vec<f64> {
        self.units(true)
    }

    /// Which components the input view supplies externally.
    ///
    /// Scoring counts a target-ON component as "completion-required" exactly
    /// when this mask leaves it off.
    pub fn cue_mask(&self) -> Vec<bool> {
        self.input_units().iter().map(|&v| v > 0.0).collect()
    }
}

/// An ordered, named list of patterns.
#[derive(Clone, Debug)]
pub struct PatternSet {
    name: String,
    patterns: Vec<Pattern>,
}

impl PatternSet {
    pub fn new(name: impl Into<String>, patterns: Vec<Pattern>) -> Self {
        Self {
            name: name.into(),
            patterns,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn get(&self, i: usize) -> &Pattern {
        &self.patterns[i]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pattern> {
        self.patterns.iter()
    }
}

/// Assembles pool vectors and drift-chain vectors into patterns.
pub struct PatternAssembler {
    layout: Arc<PatternLayout>,
}

impl PatternAssembler {
    pub fn new(layout: Arc<PatternLayout>) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &Arc<PatternLayout> {
        &self.layout
    }

    /// Build a single cue→target pattern with one context vector per
    /// context slot, in layout order.
    pub fn pair_pattern(
        &self,
        name: impl Into<String>,
        cue: &FeatureVector,
        target: &FeatureVector,
        contexts: &[&FeatureVector],
    ) -> Result<Pattern> {
        let mut fills = Vec::with_capacity(self.layout.slots().len());
        let mut ctx_iter = contexts.iter();
        for slot in self.layout.slots() {
            let fill = match slot.role {
                SlotRole::Cue => cue.clone(),
                SlotRole::Target => target.clone(),
                SlotRole::Context => (*ctx_iter
                    .next()
                    .ok_or_else(|| ReverieError::EmptyInput("missing context fill".to_string()))?)
                .clone(),
            };
            fills.push(fill);
        }
        Pattern::new(Arc::clone(&self.layout), name, fills)
    }

    /// Build an ordered set of cue→target patterns, stamping item `i` with
    /// the context vectors at chain index `offset + i` of each channel.
    ///
    /// `cues` and `targets` must have equal length, and every chain must be
    /// long enough to cover `offset + cues.len() - 1`.
    pub fn paired_set(
        &self,
        set_name: impl Into<String>,
        cues: &[FeatureVector],
        targets: &[FeatureVector],
        chains: &[DriftChain],
        offset: usize,
    ) -> Result<PatternSet> {
        if cues.len() != targets.len() {
            return Err(ReverieError::ShapeMismatch {
                expected: cues.len(),
                got: targets.len(),
            });
        }
        let set_name = set_name.into();
        let mut patterns = Vec::with_capacity(cues.len());
        for (i, (cue, target)) in cues.iter().zip(targets.iter()).enumerate() {
            let contexts: Vec<&FeatureVector> =
                chains.iter().map(|c| c.get(offset + i)).collect();
            let pattern = self.pair_pattern(
                format!("{}_{}", set_name, i),
                cue,
                target,
                &contexts,
            )?;
            patterns.push(pattern);
        }
        Ok(PatternSet::new(set_name, patterns))
    }
}

/// An ordered list of (epoch range → pattern set) bindings, resolved once
/// before a run.
///
/// Curriculum changes (e.g. a different drift-chain segment supplying the
/// context slots) are expressed by binding different sets to different epoch
/// ranges; within a run the schedule is immutable.
pub struct CurriculumSchedule {
    bindings: Vec<(Range<usize>, Arc<PatternSet>)>,
}

impl CurriculumSchedule {
    pub fn new(bindings: Vec<(Range<usize>, Arc<PatternSet>)>) -> Self {
        Self { bindings }
    }

    /// A schedule binding one set to every epoch.
    pub fn single(set: Arc<PatternSet>) -> Self {
        Self {
            bindings: vec![(0..usize::MAX, set)],
        }
    }

    /// The set bound to `epoch`. When ranges overlap, the last binding wins.
    pub fn set_for_epoch(&self, epoch: usize) -> Result<&Arc<PatternSet>> {
        self.bindings
            .iter()
            .rev()
            .find(|(range, _)| range.contains(&epoch))
            .map(|(_, set)| set)
            .ok_or(ReverieError::CurriculumGap(epoch))
    }
}

//! Dirty flags driving incremental layout.
//!
//! A box carries any combination of these. Setting a flag on a box marks
//! its ancestors with the *derived* flag (`NEED_CHILD_REFLOW` for the two
//! reflow flags, `NEED_CHILD_EXPANSION` for `NEED_EXPANSION`) so the next
//! pass can find dirty subtrees from the root without visiting clean ones.

use bitflags::bitflags;

bitflags! {
    /// Work a box needs on the next layout pass.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct LayoutFlags: u8 {
        /// The box's children must be regenerated from the content tree.
        const NEED_EXPANSION = 0x01;
        /// Some descendant needs regeneration.
        const NEED_CHILD_EXPANSION = 0x02;
        /// The box itself must be laid out again.
        const NEED_REFLOW = 0x04;
        /// Some descendant must be laid out again.
        const NEED_CHILD_REFLOW = 0x08;
        /// Only the offsets ('top', 'left', ...) of a positioned box changed.
        const NEED_REPOSITION = 0x10;
    }
}

impl LayoutFlags {
    /// Any flag that makes a layout pass visit the box.
    pub const ANY_REFLOW: Self = Self::NEED_REFLOW
        .union(Self::NEED_CHILD_REFLOW)
        .union(Self::NEED_REPOSITION);

    /// Flags that rule out reusing the previous geometry of a box.
    pub const RELAYOUT: Self = Self::NEED_REFLOW.union(Self::NEED_CHILD_REFLOW);

    /// The flag ancestors receive when `self` is set on a descendant.
    #[must_use]
    pub const fn derived(self) -> Self {
        let mut derived = Self::empty();
        if self.intersects(Self::NEED_EXPANSION.union(Self::NEED_CHILD_EXPANSION)) {
            derived = derived.union(Self::NEED_CHILD_EXPANSION);
        }
        if self.intersects(
            Self::NEED_REFLOW
                .union(Self::NEED_CHILD_REFLOW)
                .union(Self::NEED_REPOSITION),
        ) {
            derived = derived.union(Self::NEED_CHILD_REFLOW);
        }
        derived
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_flags() {
        assert_eq!(
            LayoutFlags::NEED_REFLOW.derived(),
            LayoutFlags::NEED_CHILD_REFLOW
        );
        assert_eq!(
            LayoutFlags::NEED_EXPANSION.derived(),
            LayoutFlags::NEED_CHILD_EXPANSION
        );
        assert_eq!(
            (LayoutFlags::NEED_EXPANSION | LayoutFlags::NEED_REPOSITION).derived(),
            LayoutFlags::NEED_CHILD_EXPANSION | LayoutFlags::NEED_CHILD_REFLOW
        );
        assert!(LayoutFlags::empty().derived().is_empty());
    }
}

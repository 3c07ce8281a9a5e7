/// Particle Attribute Table
///
/// Fixed, dense enumeration of every per-particle attribute the store can
/// carry, with compile-time stride and clear-on-reuse info. Which attributes
/// a component actually uses is a runtime bitset over this table; vector
/// quantities occupy one column per component (SoA layout).

/// Per-particle attribute id, indexing the column table of a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum ParticleAttr {
    /// Id of the parent particle in the parent component's store.
    ParentId,
    /// Global spawn-order serial, stable across removal compaction.
    SpawnSerial,
    /// Flag bitfield (see `constants::state_flags`).
    State,
    /// Age in frame-normalized units; newborns carry back-dated values.
    NormalAge,
    /// Fraction of the spawn episode elapsed at birth.
    SpawnFraction,
    LifeTime,
    InvLifeTime,
    /// Per-particle random seed.
    Random,
    PositionX,
    PositionY,
    PositionZ,
    VelocityX,
    VelocityY,
    VelocityZ,
}

/// Number of entries in the attribute table.
pub const ATTR_COUNT: usize = 14;

/// Static layout info for one attribute column
#[derive(Debug, Clone, Copy)]
pub struct AttrInfo {
    /// Element size in bytes.
    pub stride: usize,
    /// Buffer must be re-zeroed every time the attribute is re-added.
    pub needs_clear: bool,
}

const ATTR_INFO: [AttrInfo; ATTR_COUNT] = [
    AttrInfo { stride: 4, needs_clear: false }, // ParentId
    AttrInfo { stride: 4, needs_clear: false }, // SpawnSerial
    AttrInfo { stride: 1, needs_clear: true },  // State
    AttrInfo { stride: 4, needs_clear: false }, // NormalAge
    AttrInfo { stride: 4, needs_clear: false }, // SpawnFraction
    AttrInfo { stride: 4, needs_clear: false }, // LifeTime
    AttrInfo { stride: 4, needs_clear: false }, // InvLifeTime
    AttrInfo { stride: 4, needs_clear: true },  // Random
    AttrInfo { stride: 4, needs_clear: false }, // PositionX
    AttrInfo { stride: 4, needs_clear: false }, // PositionY
    AttrInfo { stride: 4, needs_clear: false }, // PositionZ
    AttrInfo { stride: 4, needs_clear: false }, // VelocityX
    AttrInfo { stride: 4, needs_clear: false }, // VelocityY
    AttrInfo { stride: 4, needs_clear: false }, // VelocityZ
];

impl ParticleAttr {
    /// All attributes, in table order.
    pub const ALL: [ParticleAttr; ATTR_COUNT] = [
        ParticleAttr::ParentId,
        ParticleAttr::SpawnSerial,
        ParticleAttr::State,
        ParticleAttr::NormalAge,
        ParticleAttr::SpawnFraction,
        ParticleAttr::LifeTime,
        ParticleAttr::InvLifeTime,
        ParticleAttr::Random,
        ParticleAttr::PositionX,
        ParticleAttr::PositionY,
        ParticleAttr::PositionZ,
        ParticleAttr::VelocityX,
        ParticleAttr::VelocityY,
        ParticleAttr::VelocityZ,
    ];

    /// Dense table index of this attribute.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Static layout info for this attribute.
    #[inline]
    pub const fn info(self) -> AttrInfo {
        ATTR_INFO[self as usize]
    }
}

/// Runtime set of in-use attributes, a bitset over the dense table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttrMask(u32);

impl AttrMask {
    pub const fn empty() -> Self {
        AttrMask(0)
    }

    #[inline]
    pub fn set(&mut self, attr: ParticleAttr) {
        self.0 |= 1 << attr.index();
    }

    #[inline]
    pub fn unset(&mut self, attr: ParticleAttr) {
        self.0 &= !(1 << attr.index());
    }

    #[inline]
    pub fn contains(&self, attr: ParticleAttr) -> bool {
        self.0 & (1 << attr.index()) != 0
    }

    #[inline]
    pub fn clear(&mut self) {
        self.0 = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_dense() {
        for (i, attr) in ParticleAttr::ALL.iter().enumerate() {
            assert_eq!(attr.index(), i);
        }
    }

    #[test]
    fn test_strides_divide_group_words() {
        // Word-backed columns rely on every stride dividing an 8-byte word
        // evenly once capacities are group aligned.
        for attr in ParticleAttr::ALL {
            let stride = attr.info().stride;
            assert!(matches!(stride, 1 | 4 | 8), "unexpected stride {}", stride);
        }
    }

    #[test]
    fn test_mask_set_unset() {
        let mut mask = AttrMask::empty();
        assert!(!mask.contains(ParticleAttr::NormalAge));

        mask.set(ParticleAttr::NormalAge);
        mask.set(ParticleAttr::State);
        assert!(mask.contains(ParticleAttr::NormalAge));
        assert!(mask.contains(ParticleAttr::State));
        assert!(!mask.contains(ParticleAttr::ParentId));

        mask.unset(ParticleAttr::State);
        assert!(!mask.contains(ParticleAttr::State));

        mask.clear();
        assert_eq!(mask, AttrMask::empty());
    }
}

/// Particle Store
///
/// Structure-of-arrays particle storage with one type-erased column per
/// attribute. All columns share one capacity and one live count; growth
/// resizes every in-use column in lockstep. New particles enter through a
/// two-phase protocol: `reserve_spawn_region` places them past the live
/// range so init features can fill their data, then `commit_spawn_region`
/// compacts them into the live set.

use log::debug;

use crate::constants::{align_to_group, particles::INVALID_ID};
use crate::container::attribute::{AttrMask, ParticleAttr, ATTR_COUNT};
use crate::container::remove::{
    clear_flag_in_words, make_swap_ids, swap_to_end_remove, swap_to_end_remove_bytes,
};
use crate::container::ParticleId;

/// One contiguous run of newly created particles sharing a parent and one
/// linear age/fraction interpolation. Produced by the spawn scheduler,
/// consumed by `ParticleStore::reserve_spawn_region`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnBatch {
    pub count: u32,
    pub parent_id: ParticleId,
    pub age_begin: f32,
    pub age_increment: f32,
    pub fraction_begin: f32,
    pub fraction_increment: f32,
}

impl Default for SpawnBatch {
    fn default() -> Self {
        Self {
            count: 0,
            parent_id: INVALID_ID,
            age_begin: 0.0,
            age_increment: 0.0,
            fraction_begin: 0.0,
            fraction_increment: 0.0,
        }
    }
}

/// Owned buffer for one attribute column. Backed by 8-byte words so the
/// group-aligned byte length divides evenly for every element stride and
/// stays aligned for typed views. Fresh allocations are zero-filled.
struct Column {
    words: Vec<u64>,
}

impl Column {
    fn zeroed(capacity: u32, stride: usize) -> Self {
        Self {
            words: vec![0u64; capacity as usize * stride / 8],
        }
    }

    fn bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.words)
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        bytemuck::cast_slice_mut(&mut self.words)
    }

    fn fill_zero(&mut self) {
        self.words.fill(0);
    }
}

/// Structure-of-arrays particle container
pub struct ParticleStore {
    columns: [Option<Column>; ATTR_COUNT],
    in_use: AttrMask,
    capacity: u32,
    live_count: u32,
    first_spawn_id: u32,
    last_spawn_id: u32,
    next_spawn_serial: u32,
}

impl Default for ParticleStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ParticleStore {
    pub fn new() -> Self {
        Self {
            columns: std::array::from_fn(|_| None),
            in_use: AttrMask::empty(),
            capacity: 0,
            live_count: 0,
            first_spawn_id: 0,
            last_spawn_id: 0,
            next_spawn_serial: 0,
        }
    }

    /// Particles in `[0, live_count)` are fully valid.
    #[inline]
    pub fn live_count(&self) -> u32 {
        self.live_count
    }

    /// Allocated slots, always a multiple of the group granularity.
    #[inline]
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// The pending spawn region, reserved but not yet committed.
    #[inline]
    pub fn spawn_range(&self) -> std::ops::Range<u32> {
        self.first_spawn_id..self.last_spawn_id
    }

    #[inline]
    pub fn num_spawned(&self) -> u32 {
        self.last_spawn_id - self.first_spawn_id
    }

    /// Serial the next spawned particle will receive.
    #[inline]
    pub fn next_spawn_serial(&self) -> u32 {
        self.next_spawn_serial
    }

    #[inline]
    pub fn has(&self, attr: ParticleAttr) -> bool {
        self.in_use.contains(attr)
    }

    /// Mark an attribute in-use, allocating its column on first use.
    /// Re-adding an attribute that clears on reuse re-zeroes its buffer.
    pub fn add_attribute(&mut self, attr: ParticleAttr) {
        self.in_use.set(attr);
        if let Some(column) = &mut self.columns[attr.index()] {
            if attr.info().needs_clear {
                column.fill_zero();
            }
        } else {
            self.columns[attr.index()] = Some(Column::zeroed(self.capacity, attr.info().stride));
        }
    }

    /// Clear all in-use flags without freeing memory. Used when the owning
    /// component recompiles its attribute set; follow with `add_attribute`
    /// calls and a `trim`.
    pub fn reset_used_attributes(&mut self) {
        self.in_use.clear();
    }

    /// Free columns whose attribute is no longer in-use.
    pub fn trim(&mut self) {
        for attr in ParticleAttr::ALL {
            if !self.in_use.contains(attr) && self.columns[attr.index()].is_some() {
                debug!("trimming unused particle column {:?}", attr);
                self.columns[attr.index()] = None;
            }
        }
    }

    /// Free everything and reset all counters to zero.
    pub fn clear(&mut self) {
        for slot in &mut self.columns {
            *slot = None;
        }
        self.in_use.clear();
        self.capacity = 0;
        self.live_count = 0;
        self.first_spawn_id = 0;
        self.last_spawn_id = 0;
        self.next_spawn_serial = 0;
    }

    /// Ensure capacity for `requested` particles. Growth is amortized: the
    /// new capacity adds half the old one (bounded by the request) on top of
    /// the immediate requirement, rounded up to group granularity. Contents
    /// of the live range are preserved; columns for attributes no longer
    /// in-use are freed. Allocation failure aborts; there is no
    /// partial-growth recovery.
    pub fn grow(&mut self, requested: u32) {
        let requested = align_to_group(requested);
        if requested <= self.capacity {
            return;
        }

        let new_capacity = align_to_group(requested + (requested >> 1).min(self.capacity));
        debug!(
            "growing particle store {} -> {} slots",
            self.capacity, new_capacity
        );

        for attr in ParticleAttr::ALL {
            let index = attr.index();
            if self.in_use.contains(attr) {
                let stride = attr.info().stride;
                let mut column = Column::zeroed(new_capacity, stride);
                if let Some(old) = &self.columns[index] {
                    let live_bytes = self.live_count as usize * stride;
                    column.bytes_mut()[..live_bytes].copy_from_slice(&old.bytes()[..live_bytes]);
                }
                self.columns[index] = Some(column);
            } else {
                self.columns[index] = None;
            }
        }

        self.capacity = new_capacity;
    }

    /// Typed view over one attribute column, `capacity` elements long.
    /// `[0, live_count)` is live data; the spawn range holds newborns
    /// between reserve and commit.
    pub fn data<T: bytemuck::Pod>(&self, attr: ParticleAttr) -> &[T] {
        debug_assert!(self.has(attr), "attribute {:?} not in use", attr);
        debug_assert_eq!(std::mem::size_of::<T>(), attr.info().stride);
        match &self.columns[attr.index()] {
            Some(column) => bytemuck::cast_slice(&column.words),
            None => &[],
        }
    }

    pub fn data_mut<T: bytemuck::Pod>(&mut self, attr: ParticleAttr) -> &mut [T] {
        debug_assert!(self.has(attr), "attribute {:?} not in use", attr);
        debug_assert_eq!(std::mem::size_of::<T>(), attr.info().stride);
        match &mut self.columns[attr.index()] {
            Some(column) => bytemuck::cast_slice_mut(&mut column.words),
            None => &mut [],
        }
    }

    /// Reserve and initialize the pending spawn region from a batch list.
    /// The region starts at the group-aligned end of the live range; the gap
    /// this leaves (if any) is closed later by `commit_spawn_region`.
    pub fn reserve_spawn_region(&mut self, batches: &[SpawnBatch]) {
        let total: u32 = batches.iter().map(|batch| batch.count).sum();
        if total == 0 {
            self.first_spawn_id = self.live_count;
            self.last_spawn_id = self.live_count;
            return;
        }

        self.first_spawn_id = align_to_group(self.live_count);
        self.last_spawn_id = self.first_spawn_id;

        self.grow(self.first_spawn_id + total);

        let mut current = self.first_spawn_id;
        for batch in batches {
            let begin = current as usize;
            let end = begin + batch.count as usize;

            if self.has(ParticleAttr::ParentId) {
                let parent_ids = self.data_mut::<u32>(ParticleAttr::ParentId);
                parent_ids[begin..end].fill(batch.parent_id);
            }

            if self.has(ParticleAttr::SpawnSerial) {
                let mut serial = self.next_spawn_serial;
                let serials = self.data_mut::<u32>(ParticleAttr::SpawnSerial);
                for slot in &mut serials[begin..end] {
                    *slot = serial;
                    serial += 1;
                }
                self.next_spawn_serial = serial;
            } else {
                // Serials stay globally unique even while the attribute is off
                self.next_spawn_serial += batch.count;
            }

            if self.has(ParticleAttr::NormalAge) {
                let mut age = batch.age_begin;
                let ages = self.data_mut::<f32>(ParticleAttr::NormalAge);
                for slot in &mut ages[begin..end] {
                    *slot = age;
                    age += batch.age_increment;
                }
            }

            if self.has(ParticleAttr::SpawnFraction) {
                let mut fraction = batch.fraction_begin;
                let fractions = self.data_mut::<f32>(ParticleAttr::SpawnFraction);
                for slot in &mut fractions[begin..end] {
                    *slot = fraction.min(1.0);
                    fraction += batch.fraction_increment;
                }
            }

            current += batch.count;
            self.last_spawn_id += batch.count;
            debug_assert!(self.last_spawn_id <= self.capacity);
        }
    }

    /// Reserve a single particle; convenience wrapper over
    /// `reserve_spawn_region`. Pairs with `commit_spawn_region` like any
    /// other reservation.
    pub fn spawn_particle(&mut self, parent_id: ParticleId) {
        let batch = SpawnBatch {
            count: 1,
            parent_id,
            ..SpawnBatch::default()
        };
        self.reserve_spawn_region(std::slice::from_ref(&batch));
    }

    /// Merge the pending spawn region into the live set, closing the gap
    /// left by the group-aligned reservation with a block copy per column.
    pub fn commit_spawn_region(&mut self) {
        debug_assert!(self.first_spawn_id >= self.live_count);

        let num_spawned = self.num_spawned();
        let gap = self.first_spawn_id - self.live_count;
        let moving_id = self.last_spawn_id - gap.min(num_spawned);
        if gap != 0 {
            for attr in ParticleAttr::ALL {
                let stride = attr.info().stride;
                let Some(column) = self.columns[attr.index()].as_mut() else {
                    continue;
                };
                let src = moving_id as usize * stride;
                let dst = self.live_count as usize * stride;
                let len = gap as usize * stride;
                column.bytes_mut().copy_within(src..src + len, dst);
            }
        }

        self.live_count = self.last_spawn_id - gap;
        self.first_spawn_id = self.live_count;
        self.last_spawn_id = self.live_count;
    }

    /// Delete live particles by id, compacting every in-use column with
    /// tail copies. `to_remove` must be ascending and within the live range.
    /// When `swap_map` is supplied it receives the old-id to new-id mapping
    /// (removed ids map to `INVALID_ID`) for the caller to fix up external
    /// index references.
    pub fn remove(&mut self, to_remove: &[ParticleId], swap_map: Option<&mut Vec<ParticleId>>) {
        if to_remove.is_empty() {
            return;
        }

        debug_assert!(to_remove.windows(2).all(|pair| pair[0] < pair[1]));
        debug_assert!(to_remove
            .last()
            .map_or(true, |&id| id < self.live_count));

        let live_count = self.live_count as usize;
        if let Some(map) = swap_map {
            make_swap_ids(live_count, to_remove, map);
        }

        for attr in ParticleAttr::ALL {
            if !self.in_use.contains(attr) {
                continue;
            }
            let Some(column) = self.columns[attr.index()].as_mut() else {
                continue;
            };
            let stride = attr.info().stride;
            match stride {
                1 => swap_to_end_remove(live_count, to_remove, column.bytes_mut()),
                4 => {
                    let data: &mut [u32] = bytemuck::cast_slice_mut(&mut column.words);
                    swap_to_end_remove(live_count, to_remove, data);
                }
                8 => swap_to_end_remove(live_count, to_remove, &mut column.words),
                _ => swap_to_end_remove_bytes(live_count, to_remove, column.bytes_mut(), stride),
            }
        }

        self.live_count -= to_remove.len() as u32;
    }

    /// Bulk-clear one State flag across the live range, widest word first.
    /// Semantically `for each live particle: state &= !flag`.
    pub fn clear_state_flag(&mut self, flag: u8) {
        if !self.in_use.contains(ParticleAttr::State) {
            return;
        }
        let live_bytes = self.live_count as usize;
        if let Some(column) = self.columns[ParticleAttr::State.index()].as_mut() {
            clear_flag_in_words(&mut column.words, live_bytes, flag);
        }
    }
}

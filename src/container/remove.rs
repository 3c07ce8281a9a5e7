/// Removal kernels for the particle store
///
/// Bulk deletion compacts the live range by overwriting removed slots with
/// data from the tail, one pass per column. The same permutation applied to
/// an identity map and inverted yields the old-id to new-id swap map callers
/// use to fix up external index references.

use crate::constants::particles::INVALID_ID;

/// Overwrite each removed slot with a surviving element taken from the tail
/// of the live range. `to_remove` must be ascending; tail slots that are
/// themselves scheduled for removal are skipped as sources.
pub(crate) fn swap_to_end_remove<T: Copy>(live_count: usize, to_remove: &[u32], data: &mut [T]) {
    let final_size = live_count - to_remove.len();
    let mut end = live_count;
    let mut tail = to_remove.len();
    for &removed in to_remove {
        let removed = removed as usize;
        if removed >= final_size {
            break;
        }
        end -= 1;
        while tail > 0 && end == to_remove[tail - 1] as usize {
            tail -= 1;
            end -= 1;
        }
        data[removed] = data[end];
    }
}

/// Generic-stride fallback of `swap_to_end_remove` operating on raw bytes.
pub(crate) fn swap_to_end_remove_bytes(
    live_count: usize,
    to_remove: &[u32],
    data: &mut [u8],
    stride: usize,
) {
    let final_size = live_count - to_remove.len();
    let mut end = live_count;
    let mut tail = to_remove.len();
    for &removed in to_remove {
        let removed = removed as usize;
        if removed >= final_size {
            break;
        }
        end -= 1;
        while tail > 0 && end == to_remove[tail - 1] as usize {
            tail -= 1;
            end -= 1;
        }
        let src = end * stride;
        data.copy_within(src..src + stride, removed * stride);
    }
}

/// Build the old-id to new-id map for one removal: start from the identity,
/// apply the compaction permutation to it, mark ids past the new live count
/// invalid, then invert in place so `map[old] = new` for every survivor and
/// `map[removed] = INVALID_ID`.
pub(crate) fn make_swap_ids(live_count: usize, to_remove: &[u32], map: &mut Vec<u32>) {
    let final_size = live_count - to_remove.len();

    map.clear();
    map.extend(0..live_count as u32);
    swap_to_end_remove(live_count, to_remove, map);
    for slot in &mut map[final_size..] {
        *slot = INVALID_ID;
    }

    for i in 0..final_size {
        let moved_from = map[i] as usize;
        let forwarded = map[moved_from];
        map[i] = forwarded;
        map[moved_from] = i as u32;
    }
}

/// Clear one flag bit across `live_bytes` particle states, whole 8-byte
/// words first, then the tail byte by byte.
pub(crate) fn clear_flag_in_words(words: &mut [u64], live_bytes: usize, flag: u8) {
    let mask = !flag;
    let wide = u64::from_ne_bytes([mask; 8]);

    let full_words = live_bytes / 8;
    for word in &mut words[..full_words] {
        *word &= wide;
    }

    let bytes: &mut [u8] = bytemuck::cast_slice_mut(words);
    for byte in &mut bytes[full_words * 8..live_bytes] {
        *byte &= mask;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_swap_to_end_basic() {
        let mut data = [10u32, 11, 12, 13, 14, 15];
        swap_to_end_remove(6, &[2, 4], &mut data);
        assert_eq!(&data[..4], &[10, 11, 15, 13]);
    }

    #[test]
    fn test_swap_to_end_skips_removed_tail_sources() {
        let mut data = [10u32, 11, 12, 13, 14, 15];
        swap_to_end_remove(6, &[2, 5], &mut data);
        assert_eq!(&data[..4], &[10, 11, 14, 13]);
    }

    #[test]
    fn test_swap_to_end_pure_tail_removal_copies_nothing() {
        let mut data = [10u32, 11, 12, 13];
        swap_to_end_remove(4, &[3], &mut data);
        assert_eq!(&data[..3], &[10, 11, 12]);
    }

    #[test]
    fn test_swap_to_end_remove_all() {
        let mut data = [1u32, 2, 3];
        swap_to_end_remove(3, &[0, 1, 2], &mut data);
        assert_eq!(data, [1, 2, 3]);
    }

    #[test]
    fn test_byte_fallback_matches_typed_path() {
        // 3-byte elements exercise the generic path
        let mut bytes: Vec<u8> = (0..6u8).flat_map(|i| [i, i, i]).collect();
        swap_to_end_remove_bytes(6, &[1, 2], &mut bytes, 3);
        let elements: Vec<u8> = bytes.chunks(3).take(4).map(|chunk| chunk[0]).collect();
        assert_eq!(elements, vec![0, 5, 4, 3]);
    }

    #[test]
    fn test_swap_ids_inverts_to_old_to_new() {
        let mut map = Vec::new();
        make_swap_ids(6, &[2, 4], &mut map);
        assert_eq!(map, vec![0, 1, INVALID_ID, 3, INVALID_ID, 2]);
    }

    #[test]
    fn test_clear_flag_word_and_tail_lanes() {
        let mut words = vec![u64::MAX; 2];
        clear_flag_in_words(&mut words, 11, 0b0000_0010);

        let bytes: &[u8] = bytemuck::cast_slice(&words);
        for &byte in bytes.iter().take(11) {
            assert_eq!(byte, 0b1111_1101);
        }
        // Bytes past the live range keep their flags
        for &byte in bytes.iter().skip(11) {
            assert_eq!(byte, 0xff);
        }
    }
}

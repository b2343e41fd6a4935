//! Binary Huffman tree over vocabulary leaves.
//!
//! Builds the tree with the classical two-pointer merge over two ordered
//! sequences — the leaves (already sorted by descending count, scanned
//! right to left) and the freshly created internal nodes (scanned left to
//! right) — so the whole pass is O(V) with no priority queue. This is a
//! direct port of `CreateBinaryTree` from the reference implementation.

use crate::vocab::Vocabulary;
use crate::MAX_CODE_LENGTH;

/// Sentinel weight for not-yet-computed internal nodes; higher than any
/// achievable sum of leaf counts, so it never wins a two-pointer comparison
/// before its real value is filled in. Prevents the numeric-overflow
/// concern noted in spec.md §7(d).
const SENTINEL_WEIGHT: i64 = 1_000_000_000_000_000;

/// Build the Huffman tree over `vocab`'s entries and write each entry's
/// `code`/`codelen`/`point` fields in place. Cheap enough to run
/// unconditionally even when hierarchical softmax is disabled.
pub fn build(vocab: &mut Vocabulary) {
    let v = vocab.len();
    if v <= 1 {
        // A single-leaf (or empty) vocabulary has nothing to encode.
        return;
    }

    let mut count = vec![0i64; v * 2 - 1];
    let mut binary = vec![0u8; v * 2 - 1];
    let mut parent = vec![0usize; v * 2 - 1];

    for a in 0..v {
        count[a] = vocab.entry(a).count as i64;
    }
    for a in v..v * 2 - 1 {
        count[a] = SENTINEL_WEIGHT;
    }

    let mut pos1: isize = v as isize - 1;
    let mut pos2: usize = v;

    for a in 0..v - 1 {
        let min1i = if pos1 >= 0 && count[pos1 as usize] < count[pos2] {
            let i = pos1 as usize;
            pos1 -= 1;
            i
        } else {
            let i = pos2;
            pos2 += 1;
            i
        };
        let min2i = if pos1 >= 0 && count[pos1 as usize] < count[pos2] {
            let i = pos1 as usize;
            pos1 -= 1;
            i
        } else {
            let i = pos2;
            pos2 += 1;
            i
        };
        count[v + a] = count[min1i] + count[min2i];
        parent[min1i] = v + a;
        parent[min2i] = v + a;
        binary[min2i] = 1;
    }

    // Walk each leaf up to the root, then reverse so bit 0 is the
    // root-side decision.
    let root = v * 2 - 2;
    let mut code = [0u8; MAX_CODE_LENGTH];
    let mut point = [0usize; MAX_CODE_LENGTH];
    for leaf in 0..v {
        let mut node = leaf;
        let mut depth = 0;
        loop {
            code[depth] = binary[node];
            point[depth] = node;
            depth += 1;
            node = parent[node];
            if node == root || depth >= MAX_CODE_LENGTH {
                break;
            }
        }
        let entry = vocab.entry_mut(leaf);
        entry.codelen = depth;
        entry.point[0] = v as i32 - 2;
        for b in 0..depth {
            entry.code[depth - b - 1] = code[b];
            entry.point[depth - b] = point[b] as i32 - v as i32;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    fn vocab_from(corpus: &str, min_count: u64) -> Vocabulary {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(corpus.as_bytes()).unwrap();
        Vocabulary::learn_from(f.path(), min_count).unwrap()
    }

    #[test]
    fn every_leaf_has_a_unique_path() {
        let mut vocab = vocab_from("a a a a b b c d e\n", 1);
        build(&mut vocab);
        let mut paths = std::collections::HashSet::new();
        for i in 0..vocab.len() {
            let e = vocab.entry(i);
            let path: Vec<u8> = e.code[..e.codelen].to_vec();
            assert!(paths.insert(path), "duplicate code path for entry {i}");
        }
    }

    #[test]
    fn more_frequent_words_get_shorter_or_equal_codes() {
        let mut vocab = vocab_from("a a a a a a a b b c d e f\n", 1);
        build(&mut vocab);
        // entry 1 is the most frequent non-</s> word after sort.
        let most_frequent_len = vocab.entry(1).codelen;
        let least_frequent_len = vocab.entry(vocab.len() - 1).codelen;
        assert!(most_frequent_len <= least_frequent_len);
    }

    #[test]
    fn single_leaf_vocabulary_is_a_no_op() {
        let mut vocab = vocab_from("", 1);
        assert_eq!(vocab.len(), 1);
        build(&mut vocab);
        assert_eq!(vocab.entry(0).codelen, 0);
    }
}

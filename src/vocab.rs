//! Open-addressed vocabulary index.
//!
//! Linear-probe hash table over word bytes, backed by a flat `Vec` of
//! entries. `</s>` is always entry 0. Mirrors `AddWordToVocab` /
//! `SearchVocab` / `ReduceVocab` / `SortVocab` from the reference
//! implementation closely enough that the deterministic scenarios in
//! spec.md §8 (fixed thread count, fixed corpus) reproduce bit for bit.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::tokenizer::Tokenizer;
use crate::{Error, MAX_CODE_LENGTH, VOCAB_HASH_SIZE};

/// One vocabulary entry. `code`/`point` are filled in by [`crate::huffman`]
/// once the vocabulary is sorted; they are meaningless before that.
#[derive(Clone, Debug)]
pub struct VocabEntry {
    pub word: Vec<u8>,
    pub count: u64,
    pub code: [u8; MAX_CODE_LENGTH],
    pub codelen: usize,
    pub point: [i32; MAX_CODE_LENGTH],
}

impl VocabEntry {
    fn new(word: Vec<u8>, count: u64) -> Self {
        VocabEntry {
            word,
            count,
            code: [0; MAX_CODE_LENGTH],
            codelen: 0,
            point: [0; MAX_CODE_LENGTH],
        }
    }
}

/// The vocabulary index: a sorted entry table plus its open-addressed hash.
pub struct Vocabulary {
    entries: Vec<VocabEntry>,
    hash: Vec<i32>,
    min_reduce: u64,
    train_words: u64,
}

fn word_hash(word: &[u8]) -> usize {
    let mut hash: u64 = 0;
    for &b in word {
        hash = hash.wrapping_mul(257).wrapping_add(b as u64);
    }
    (hash % VOCAB_HASH_SIZE as u64) as usize
}

impl Vocabulary {
    fn empty() -> Self {
        Vocabulary {
            entries: Vec::new(),
            hash: vec![-1; VOCAB_HASH_SIZE],
            min_reduce: 1,
            train_words: 0,
        }
    }

    /// Number of entries (including `</s>`).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, idx: usize) -> &VocabEntry {
        &self.entries[idx]
    }

    pub fn entry_mut(&mut self, idx: usize) -> &mut VocabEntry {
        &mut self.entries[idx]
    }

    pub fn entries(&self) -> &[VocabEntry] {
        &self.entries
    }

    /// Total token count backing the sorted, min-count-filtered vocabulary.
    pub fn train_words(&self) -> u64 {
        self.train_words
    }

    /// Insert a new entry at the tail with count 0 and index it in the hash
    /// table. The caller is responsible for incrementing `count`.
    pub fn add(&mut self, word: &[u8]) -> usize {
        let idx = self.entries.len();
        self.entries.push(VocabEntry::new(word.to_vec(), 0));
        let mut h = word_hash(word);
        while self.hash[h] != -1 {
            h = (h + 1) % VOCAB_HASH_SIZE;
        }
        self.hash[h] = idx as i32;
        idx
    }

    /// Probe the hash table for `word`, returning its index or `-1`.
    pub fn lookup(&self, word: &[u8]) -> i32 {
        let mut h = word_hash(word);
        loop {
            let slot = self.hash[h];
            if slot == -1 {
                return -1;
            }
            if self.entries[slot as usize].word == word {
                return slot;
            }
            h = (h + 1) % VOCAB_HASH_SIZE;
        }
    }

    fn rebuild_hash(&mut self) {
        self.hash.fill(-1);
        for (idx, e) in self.entries.iter().enumerate() {
            let mut h = word_hash(&e.word);
            while self.hash[h] != -1 {
                h = (h + 1) % VOCAB_HASH_SIZE;
            }
            self.hash[h] = idx as i32;
        }
    }

    /// Drop every entry (other than `</s>`) with `count <= min_reduce`,
    /// preserving relative order, then bump `min_reduce` and recompute the
    /// hash. Invoked eagerly during `learn_from` whenever the table's fill
    /// would exceed 0.7.
    pub fn reduce(&mut self) {
        let min_reduce = self.min_reduce;
        let mut kept: Vec<VocabEntry> = Vec::with_capacity(self.entries.len());
        for (i, e) in self.entries.drain(..).enumerate() {
            if i == 0 || e.count > min_reduce {
                kept.push(e);
            }
        }
        self.entries = kept;
        self.min_reduce += 1;
        self.rebuild_hash();
    }

    /// Sort entries `1..` by descending count, drop entries (other than
    /// `</s>`) with `count < min_count`, recompute the hash, and finalize
    /// `train_words`.
    pub fn sort(&mut self, min_count: u64) {
        if self.entries.is_empty() {
            return;
        }
        self.entries[1..].sort_by(|a, b| b.count.cmp(&a.count));
        let mut i = 1;
        while i < self.entries.len() {
            if self.entries[i].count < min_count {
                self.entries.truncate(i);
                break;
            }
            i += 1;
        }
        self.train_words = self.entries.iter().map(|e| e.count).sum();
        self.rebuild_hash();
    }

    /// Pass 1: build the vocabulary from a training corpus. `</s>` is added
    /// first (always index 0); every tokenized word has its count
    /// incremented (adding it if absent), triggering [`Vocabulary::reduce`]
    /// whenever the table's fill ratio would exceed 0.7. Finishes with
    /// [`Vocabulary::sort`].
    pub fn learn_from(path: &Path, min_count: u64) -> Result<Self, Error> {
        let file = File::open(path)
            .map_err(|_| Error::MissingTrainingFile(path.display().to_string()))?;
        let mut vocab = Vocabulary::empty();
        vocab.add(b"</s>");

        let mut tokenizer = Tokenizer::new(file);
        while let Some(tok) = tokenizer.next_token()? {
            let idx = vocab.lookup(&tok);
            if idx == -1 {
                let new_idx = vocab.add(&tok);
                vocab.entries[new_idx].count = 1;
            } else {
                vocab.entries[idx as usize].count += 1;
            }
            if vocab.entries.len() as f64 > VOCAB_HASH_SIZE as f64 * 0.7 {
                vocab.reduce();
            }
        }
        vocab.sort(min_count);
        Ok(vocab)
    }

    /// Write the vocabulary as `word count\n` lines, `</s>` first.
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let mut w = BufWriter::new(File::create(path)?);
        for e in &self.entries {
            w.write_all(&e.word)?;
            writeln!(w, " {}", e.count)?;
        }
        w.flush()
    }

    /// Load a vocabulary previously written by [`Vocabulary::save`]. Does
    /// not re-apply `min_count` filtering — the file is taken as already
    /// authoritative — but still sorts and recomputes `train_words`.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let file =
            File::open(path).map_err(|_| Error::MissingVocabFile(path.display().to_string()))?;
        let mut vocab = Vocabulary::empty();
        let mut reader = BufReader::new(file);
        let mut line = Vec::new();
        loop {
            line.clear();
            let n = reader.read_until(b'\n', &mut line)?;
            if n == 0 {
                break;
            }
            while line.last() == Some(&b'\n') || line.last() == Some(&b'\r') {
                line.pop();
            }
            if line.is_empty() {
                continue;
            }
            let split_at = line
                .iter()
                .rposition(|&b| b == b' ')
                .ok_or_else(|| Error::MalformedVocabLine(String::from_utf8_lossy(&line).into_owned()))?;
            let (word, count_bytes) = (&line[..split_at], &line[split_at + 1..]);
            let count: u64 = std::str::from_utf8(count_bytes)
                .ok()
                .and_then(|s| s.parse().ok())
                .ok_or_else(|| Error::MalformedVocabLine(String::from_utf8_lossy(&line).into_owned()))?;
            let idx = vocab.add(word);
            vocab.entries[idx].count = count;
        }
        if vocab.is_empty() {
            return Err(Error::MalformedVocabLine("empty vocabulary file".into()));
        }
        // min_count = 0: a loaded vocabulary's entries are kept as-is, only
        // the ordering/train_words bookkeeping is (re)established.
        vocab.sort(0);
        Ok(vocab)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    fn write_corpus(contents: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    #[test]
    fn sentence_boundary_is_always_index_zero() {
        let f = write_corpus("a b a b a b\n");
        let vocab = Vocabulary::learn_from(f.path(), 1).unwrap();
        assert_eq!(vocab.entry(0).word, b"</s>");
    }

    #[test]
    fn sort_is_non_increasing_and_respects_min_count() {
        let f = write_corpus("a a a b b c\n");
        let vocab = Vocabulary::learn_from(f.path(), 2).unwrap();
        for w in 1..vocab.len() {
            assert!(vocab.entry(w).count >= 2);
        }
        for w in 1..vocab.len().saturating_sub(1) {
            assert!(vocab.entry(w).count >= vocab.entry(w + 1).count);
        }
        assert_eq!(vocab.lookup(b"c"), -1);
    }

    #[test]
    fn lookup_matches_sorted_index() {
        let f = write_corpus("x x x y y z\n");
        let vocab = Vocabulary::learn_from(f.path(), 1).unwrap();
        for i in 0..vocab.len() {
            let w = vocab.entry(i).word.clone();
            assert_eq!(vocab.lookup(&w), i as i32);
        }
        assert_eq!(vocab.lookup(b"nonexistent"), -1);
    }

    #[test]
    fn empty_file_yields_only_sentence_boundary() {
        let f = write_corpus("");
        let vocab = Vocabulary::learn_from(f.path(), 5).unwrap();
        assert_eq!(vocab.len(), 1);
    }

    #[test]
    fn single_rare_word_is_dropped_by_min_count() {
        let f = write_corpus("x\nx\nx\nx\n");
        let vocab = Vocabulary::learn_from(f.path(), 5).unwrap();
        assert_eq!(vocab.len(), 1);
    }

    #[test]
    fn save_then_load_round_trips_word_count_index_triples() {
        let f = write_corpus("the quick brown fox the quick the\n");
        let vocab = Vocabulary::learn_from(f.path(), 1).unwrap();
        let saved = tempfile::NamedTempFile::new().unwrap();
        vocab.save(saved.path()).unwrap();
        let reloaded = Vocabulary::load(saved.path()).unwrap();
        assert_eq!(reloaded.entry(0).word, b"</s>");
        for i in 1..vocab.len() {
            let w = &vocab.entry(i).word;
            assert_eq!(reloaded.lookup(w), i as i32);
            assert_eq!(reloaded.entry(i).count, vocab.entry(i).count);
        }
    }

    #[test]
    fn save_then_load_round_trips_non_utf8_words() {
        // spec.md §3: a word is a byte string, not necessarily valid UTF-8.
        let mut vocab = Vocabulary::empty();
        vocab.add(b"</s>");
        let idx = vocab.add(&[0xff, 0xfe, b'x']);
        vocab.entries[idx].count = 3;

        let saved = tempfile::NamedTempFile::new().unwrap();
        vocab.save(saved.path()).unwrap();
        let reloaded = Vocabulary::load(saved.path()).unwrap();
        assert_eq!(reloaded.lookup(&[0xff, 0xfe, b'x']), idx as i32);
        assert_eq!(reloaded.entry(idx).count, 3);
    }

    #[test]
    fn missing_training_file_is_reported() {
        let err = Vocabulary::learn_from(Path::new("/no/such/file"), 1);
        assert!(matches!(err, Err(Error::MissingTrainingFile(_))));
    }
}

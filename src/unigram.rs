//! Unigram^0.75 sampling table for negative sampling.
//!
//! A flat array of `table_size` vocabulary indices realizing
//! `P(w) ∝ count(w)^0.75` by cumulative filling — a direct port of
//! `InitUnigramTable`.

use crate::vocab::Vocabulary;
use crate::UNIGRAM_TABLE_SIZE;

const POWER: f64 = 0.75;

pub struct UnigramTable {
    table: Vec<i32>,
}

impl UnigramTable {
    pub fn build(vocab: &Vocabulary) -> Self {
        let v = vocab.len();
        let mut table = vec![0i32; UNIGRAM_TABLE_SIZE];
        if v == 0 {
            return UnigramTable { table };
        }

        let train_words_pow: f64 = vocab
            .entries()
            .iter()
            .map(|e| (e.count as f64).powf(POWER))
            .sum();

        let mut i = 0usize;
        let mut d1 = (vocab.entry(0).count as f64).powf(POWER) / train_words_pow;
        for a in 0..UNIGRAM_TABLE_SIZE {
            table[a] = i as i32;
            if (a as f64 / UNIGRAM_TABLE_SIZE as f64) > d1 {
                i += 1;
                if i >= v {
                    i = v - 1;
                } else {
                    d1 += (vocab.entry(i).count as f64).powf(POWER) / train_words_pow;
                }
            }
        }
        UnigramTable { table }
    }

    /// Draw the vocabulary index stored at `idx % table_size`.
    pub fn sample(&self, idx: u64) -> i32 {
        self.table[(idx as usize) % self.table.len()]
    }
}

//! Per-thread SGD loop (spec.md §4.7).
//!
//! Each worker owns a file handle seeked to its byte-range start, a
//! sentence buffer, two scratch vectors, and its own RNG seeded with its
//! thread id. It runs CBOW or skip-gram, with hierarchical softmax and/or
//! negative sampling, against the shared [`crate::params::ParameterStore`]
//! with no synchronization on individual weight writes.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::sync::atomic::Ordering;

use crate::params::{Lcg64, ParameterStore};
use crate::sigmoid::SigmoidTable;
use crate::tokenizer::Tokenizer;
use crate::trainer::{Schedule, TrainingConfig};
use crate::unigram::UnigramTable;
use crate::vocab::Vocabulary;
use crate::{MAX_EXP, MAX_SENTENCE_LENGTH};

struct SeekingTokenizer {
    file: File,
}

impl SeekingTokenizer {
    fn at_offset(path: &std::path::Path, offset: u64) -> std::io::Result<Self> {
        let mut file = File::open(path)?;
        file.seek(SeekFrom::Start(offset))?;
        Ok(SeekingTokenizer { file })
    }

    fn reset(&mut self, offset: u64) -> std::io::Result<()> {
        self.file.seek(SeekFrom::Start(offset))?;
        Ok(())
    }
}

/// Run the per-thread training loop for `thread_id` of `config.threads`.
#[allow(clippy::too_many_arguments)]
pub fn run(
    thread_id: usize,
    config: &TrainingConfig,
    vocab: &Vocabulary,
    params: &ParameterStore,
    sigmoid: &SigmoidTable,
    unigram: Option<&UnigramTable>,
    schedule: &Schedule,
    file_size: u64,
) -> std::io::Result<()> {
    let dims = params.dims;
    let offset = file_size / config.threads as u64 * thread_id as u64;
    let seek = SeekingTokenizer::at_offset(&config.train_file, offset)?;
    let mut tokenizer = Tokenizer::new(seek.file.try_clone()?);
    let mut handle = seek;

    let mut rng = Lcg64::new(thread_id as u64);
    let mut neu1 = vec![0.0f32; dims];
    let mut neu1e = vec![0.0f32; dims];

    let mut sentence: Vec<i32> = Vec::with_capacity(MAX_SENTENCE_LENGTH + 1);
    let mut sentence_position: usize = 0;
    let mut local_iter = schedule.iter;
    let mut word_count: u64 = 0;
    let mut last_word_count: u64 = 0;
    let per_thread_budget = schedule.train_words / config.threads as u64;
    let mut eof_reached = false;

    loop {
        if word_count - last_word_count > 10_000 {
            schedule
                .words_done
                .fetch_add(word_count - last_word_count, Ordering::Relaxed);
            last_word_count = word_count;
            let done = schedule.words_done.load(Ordering::Relaxed) as f64;
            let mut alpha = schedule.starting_alpha
                * (1.0 - (done / (schedule.iter * schedule.train_words + 1) as f64)) as f32;
            let floor = schedule.starting_alpha * 0.0001;
            if alpha < floor {
                alpha = floor;
            }
            schedule.set_alpha(alpha);

            if config.debug > 1 {
                let progress = done / (schedule.iter * schedule.train_words + 1) as f64 * 100.0;
                let elapsed = schedule.start.elapsed().as_secs_f64().max(1e-6);
                let wps = done / config.threads as f64 / elapsed / 1000.0;
                eprint!(
                    "\rAlpha: {alpha:.6}  Progress: {progress:.2}%  Words/thread/sec: {wps:.2}k  "
                );
                let _ = std::io::Write::flush(&mut std::io::stderr());
            }
        }

        if sentence.is_empty() {
            loop {
                let tok = match tokenizer.next_token()? {
                    Some(t) => t,
                    None => {
                        eof_reached = true;
                        break;
                    }
                };
                let idx = vocab.lookup(&tok);
                if idx == -1 {
                    continue;
                }
                word_count += 1;
                if idx == 0 {
                    // A boundary on an already-empty sentence (e.g. a blank
                    // line) has nothing to train on; keep scanning instead
                    // of breaking out with nothing in `sentence`.
                    if sentence.is_empty() {
                        continue;
                    }
                    break;
                }
                if config.sample > 0.0 {
                    let cn = vocab.entry(idx as usize).count as f64;
                    let train_words = schedule.train_words as f64;
                    let s_t = config.sample * train_words;
                    let keep_prob = ((cn / s_t).sqrt() + 1.0) * s_t / cn;
                    let coin = (rng.next() & 0xFFFF) as f64 / 65536.0;
                    if keep_prob < coin {
                        continue;
                    }
                }
                sentence.push(idx);
                if sentence.len() >= MAX_SENTENCE_LENGTH {
                    break;
                }
            }
            sentence_position = 0;
        }

        if eof_reached || word_count > per_thread_budget {
            schedule
                .words_done
                .fetch_add(word_count - last_word_count, Ordering::Relaxed);
            local_iter -= 1;
            if local_iter == 0 {
                break;
            }
            word_count = 0;
            last_word_count = 0;
            sentence.clear();
            handle.reset(offset)?;
            tokenizer = Tokenizer::new(handle.file.try_clone()?);
            eof_reached = false;
            continue;
        }

        let word = sentence[sentence_position] as usize;
        let b = (rng.next() % config.window as u64) as usize;
        let window = config.window;

        let window_range = |sentence_len: usize, pos: usize| -> Vec<usize> {
            let mut ctx = Vec::new();
            for a in b..window * 2 + 1 - b {
                if a == window {
                    continue;
                }
                let c = pos as isize - window as isize + a as isize;
                if c < 0 || c as usize >= sentence_len {
                    continue;
                }
                ctx.push(c as usize);
            }
            ctx
        };
        let ctx_positions = window_range(sentence.len(), sentence_position);

        if config.cbow {
            neu1.iter_mut().for_each(|v| *v = 0.0);
            let mut cw = 0usize;
            for &c in &ctx_positions {
                let ctx_word = sentence[c] as usize;
                let row = params.w_in.row_mut(ctx_word);
                for i in 0..dims {
                    neu1[i] += row[i];
                }
                cw += 1;
            }
            if cw > 0 {
                for v in neu1.iter_mut() {
                    *v /= cw as f32;
                }
                neu1e.iter_mut().for_each(|v| *v = 0.0);
                let alpha = schedule.alpha();

                if config.hs {
                    hierarchical_softmax(vocab, params, sigmoid, word, &neu1, &mut neu1e, alpha);
                }
                if let Some(table) = unigram {
                    negative_sampling(
                        vocab, params, sigmoid, table, &mut rng, word, &neu1, &mut neu1e, alpha,
                        config.negative,
                    );
                }

                for &c in &ctx_positions {
                    let ctx_word = sentence[c] as usize;
                    let row = params.w_in.row_mut(ctx_word);
                    for i in 0..dims {
                        row[i] += neu1e[i];
                    }
                }
            }
        } else {
            let alpha = schedule.alpha();
            for &c in &ctx_positions {
                let last_word = sentence[c] as usize;
                neu1e.iter_mut().for_each(|v| *v = 0.0);
                // Skip-gram reads the single context word's row as the
                // "input" vector for both heads (neither head mutates it,
                // only the output-side matrices), so one snapshot suffices.
                let in_row: Vec<f32> = params.w_in.row_mut(last_word).to_vec();

                if config.hs {
                    hierarchical_softmax(vocab, params, sigmoid, word, &in_row, &mut neu1e, alpha);
                }
                if let Some(table) = unigram {
                    negative_sampling(
                        vocab, params, sigmoid, table, &mut rng, word, &in_row, &mut neu1e, alpha,
                        config.negative,
                    );
                }

                let row = params.w_in.row_mut(last_word);
                for i in 0..dims {
                    row[i] += neu1e[i];
                }
            }
        }

        sentence_position += 1;
        if sentence_position >= sentence.len() {
            sentence.clear();
        }
    }
    Ok(())
}

/// One head of the update: hierarchical softmax. `input` is either the
/// CBOW mean (`neu1`) or a single context word's row (skip-gram); `accum`
/// is where the propagated error is accumulated either way, matching
/// spec.md §4.7 step 5/6.
fn hierarchical_softmax(
    vocab: &Vocabulary,
    params: &ParameterStore,
    sigmoid: &SigmoidTable,
    word: usize,
    input: &[f32],
    accum: &mut [f32],
    alpha: f32,
) {
    let w_hs = match &params.w_hs {
        Some(m) => m,
        None => return,
    };
    let entry = vocab.entry(word);
    for d in 0..entry.codelen {
        let l2 = entry.point[d] as usize;
        let out_row = w_hs.row_mut(l2);
        let mut f: f64 = 0.0;
        for i in 0..input.len() {
            f += input[i] as f64 * out_row[i] as f64;
        }
        if f.abs() >= MAX_EXP {
            continue;
        }
        let sigma = sigmoid.get(f) as f64;
        let g = (1.0 - entry.code[d] as f64 - sigma) * alpha as f64;
        for i in 0..input.len() {
            accum[i] += (g as f32) * out_row[i];
        }
        for i in 0..input.len() {
            out_row[i] += (g as f32) * input[i];
        }
    }
}

/// Negative sampling head: the first draw (`d == 0`) is the positive
/// target, the remaining `negative` draws come from the unigram table,
/// skipping the true target and the reserved `</s>` slot.
#[allow(clippy::too_many_arguments)]
fn negative_sampling(
    vocab: &Vocabulary,
    params: &ParameterStore,
    sigmoid: &SigmoidTable,
    table: &UnigramTable,
    rng: &mut Lcg64,
    word: usize,
    input: &[f32],
    accum: &mut [f32],
    alpha: f32,
    negative: usize,
) {
    let w_neg = match &params.w_neg {
        Some(m) => m,
        None => return,
    };
    let vocab_size = vocab.len();
    for d in 0..=negative {
        let (target, label): (usize, f64) = if d == 0 {
            (word, 1.0)
        } else {
            let r = rng.next();
            let mut t = table.sample(r >> 16) as i64;
            if t == 0 {
                t = (r as usize % (vocab_size - 1) + 1) as i64;
            }
            if t as usize == word {
                continue;
            }
            (t as usize, 0.0)
        };

        let out_row = w_neg.row_mut(target);
        let mut f: f64 = 0.0;
        for i in 0..input.len() {
            f += input[i] as f64 * out_row[i] as f64;
        }
        let g = if f > MAX_EXP {
            (label - 1.0) * alpha as f64
        } else if f < -MAX_EXP {
            label * alpha as f64
        } else {
            (label - sigmoid.get(f) as f64) * alpha as f64
        };
        for i in 0..input.len() {
            accum[i] += (g as f32) * out_row[i];
        }
        for i in 0..input.len() {
            out_row[i] += (g as f32) * input[i];
        }
    }
}

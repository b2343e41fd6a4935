//! Top-level training configuration, learning-rate schedule, and the
//! driver sequence of spec.md §4.6.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Instant;

use log::info;

use crate::huffman;
use crate::output;
use crate::params::ParameterStore;
use crate::sigmoid::SigmoidTable;
use crate::unigram::UnigramTable;
use crate::vocab::Vocabulary;
use crate::{worker, Error};

/// Process-wide, immutable (save for `alpha`, behind [`Schedule`])
/// configuration shared by reference into every worker thread.
pub struct TrainingConfig {
    pub train_file: PathBuf,
    pub output_file: Option<PathBuf>,
    pub save_vocab_file: Option<PathBuf>,
    pub read_vocab_file: Option<PathBuf>,
    pub size: usize,
    pub window: usize,
    pub sample: f64,
    pub hs: bool,
    pub negative: usize,
    pub threads: usize,
    pub iter: u64,
    pub min_count: u64,
    pub alpha: f32,
    pub classes: usize,
    pub binary: bool,
    pub cbow: bool,
    pub debug: u32,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        TrainingConfig {
            train_file: PathBuf::new(),
            output_file: None,
            save_vocab_file: None,
            read_vocab_file: None,
            size: 100,
            window: 5,
            sample: 1e-3,
            hs: false,
            negative: 5,
            threads: 12,
            iter: 5,
            min_count: 5,
            alpha: 0.025,
            classes: 0,
            binary: false,
            cbow: true,
            debug: 2,
        }
    }
}

/// The one mutable piece of process-wide state: the learning rate, stored
/// as an `f32` bit pattern behind relaxed atomics so every worker can read
/// and write it without a lock (spec.md §9 — tearing is tolerated, a data
/// race on the bits is not).
pub struct Schedule {
    alpha_bits: AtomicU32,
    pub starting_alpha: f32,
    pub train_words: u64,
    pub iter: u64,
    pub words_done: AtomicU64,
    pub start: Instant,
}

impl Schedule {
    pub fn new(starting_alpha: f32, train_words: u64, iter: u64) -> Self {
        Schedule {
            alpha_bits: AtomicU32::new(starting_alpha.to_bits()),
            starting_alpha,
            train_words,
            iter,
            words_done: AtomicU64::new(0),
            start: Instant::now(),
        }
    }

    pub fn alpha(&self) -> f32 {
        f32::from_bits(self.alpha_bits.load(Ordering::Relaxed))
    }

    pub fn set_alpha(&self, alpha: f32) {
        self.alpha_bits.store(alpha.to_bits(), Ordering::Relaxed);
    }
}

/// Run the full pipeline of spec.md §4.6: vocabulary, parameter init,
/// Huffman tree, optional unigram table, worker fan-out, then output.
pub fn train(config: &TrainingConfig) -> Result<(), Error> {
    let mut vocab = match &config.read_vocab_file {
        Some(path) => Vocabulary::load(path)?,
        None => Vocabulary::learn_from(&config.train_file, config.min_count)?,
    };
    info!("vocabulary size: {}", vocab.len());
    info!("training words: {}", vocab.train_words());

    if let Some(path) = &config.save_vocab_file {
        vocab.save(path)?;
    }

    let output_file = match &config.output_file {
        Some(p) => p.clone(),
        None => return Ok(()),
    };

    let params = ParameterStore::new(vocab.len(), config.size, config.hs, config.negative > 0);
    huffman::build(&mut vocab);
    let unigram = (config.negative > 0).then(|| UnigramTable::build(&vocab));
    let sigmoid = SigmoidTable::new();

    let schedule = Schedule::new(config.alpha, vocab.train_words().max(1), config.iter.max(1));

    let file_size = std::fs::metadata(&config.train_file)?.len();

    std::thread::scope(|scope| {
        for id in 0..config.threads {
            let vocab = &vocab;
            let params = &params;
            let sigmoid = &sigmoid;
            let unigram = unigram.as_ref();
            let schedule = &schedule;
            scope.spawn(move || {
                if let Err(e) = worker::run(id, config, vocab, params, sigmoid, unigram, schedule, file_size) {
                    log::error!("worker {id} exited early: {e}");
                }
            });
        }
    });

    info!("words processed: {}", schedule.words_done.load(Ordering::Relaxed));

    if config.classes > 0 {
        output::write_classes(&output_file, &vocab, &params.w_in, config.classes)?;
    } else {
        output::write_vectors(&output_file, &vocab, &params.w_in, config.binary)?;
    }
    Ok(())
}

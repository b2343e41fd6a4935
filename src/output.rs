//! Model serialization: text/binary vectors, K-means classes, and the
//! read-back helpers that are the only surface this crate exposes to the
//! phrase-detector and analogy-evaluator companion tools (spec.md §4.10,
//! out of scope beyond this interface).

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::params::SharedMatrix;
use crate::vocab::Vocabulary;
use crate::Error;

/// Write `"V D\n"` followed by one `word <D floats>\n` line per vocabulary
/// entry, in binary (little-endian IEEE-754) or decimal ASCII.
pub fn write_vectors(
    path: &Path,
    vocab: &Vocabulary,
    w_in: &SharedMatrix,
    binary: bool,
) -> std::io::Result<()> {
    let mut w = BufWriter::new(File::create(path)?);
    writeln!(w, "{} {}", vocab.len(), w_in.cols())?;
    for i in 0..vocab.len() {
        w.write_all(&vocab.entry(i).word)?;
        w.write_all(b" ")?;
        let row = &w_in.as_slice()[i * w_in.cols()..(i + 1) * w_in.cols()];
        if binary {
            for &v in row {
                w.write_all(&v.to_le_bytes())?;
            }
        } else {
            for &v in row {
                write!(w, "{v} ")?;
            }
        }
        writeln!(w)?;
    }
    w.flush()
}

/// Run K-means over `W_in` for 10 iterations and write `word class_id\n`
/// per entry (spec.md §4.9). Initial assignment is `i % classes`;
/// centroid update is the mean of assigned rows, L2-normalized;
/// reassignment is argmax of dot product against the centroids.
pub fn write_classes(
    path: &Path,
    vocab: &Vocabulary,
    w_in: &SharedMatrix,
    classes: usize,
) -> std::io::Result<()> {
    let v = vocab.len();
    let d = w_in.cols();
    let data = w_in.as_slice();

    let mut assignment: Vec<usize> = (0..v).map(|i| i % classes).collect();
    let mut centroids = vec![0.0f32; classes * d];

    for _ in 0..10 {
        centroids.iter_mut().for_each(|c| *c = 0.0);
        let mut counts = vec![0u64; classes];
        for i in 0..v {
            let cls = assignment[i];
            counts[cls] += 1;
            for j in 0..d {
                centroids[cls * d + j] += data[i * d + j];
            }
        }
        for cls in 0..classes {
            if counts[cls] == 0 {
                continue;
            }
            let n = counts[cls] as f32;
            let mut norm = 0.0f32;
            for j in 0..d {
                centroids[cls * d + j] /= n;
                norm += centroids[cls * d + j] * centroids[cls * d + j];
            }
            norm = norm.sqrt().max(1e-10);
            for j in 0..d {
                centroids[cls * d + j] /= norm;
            }
        }
        for i in 0..v {
            let mut best = 0usize;
            let mut best_dot = f32::MIN;
            for cls in 0..classes {
                let mut dot = 0.0f32;
                for j in 0..d {
                    dot += data[i * d + j] * centroids[cls * d + j];
                }
                if dot > best_dot {
                    best_dot = dot;
                    best = cls;
                }
            }
            assignment[i] = best;
        }
    }

    let mut w = BufWriter::new(File::create(path)?);
    for i in 0..v {
        w.write_all(&vocab.entry(i).word)?;
        writeln!(w, " {}", assignment[i])?;
    }
    w.flush()
}

/// Read back a text-mode vector file written by [`write_vectors`]. Used by
/// the evaluator/phrase-detector companion tools, not by training itself.
pub fn read_vectors_text(path: &Path) -> Result<(Vec<String>, Vec<f32>, usize), Error> {
    let file = File::open(path).map_err(|_| Error::MissingVocabFile(path.display().to_string()))?;
    let mut reader = BufReader::new(file);

    // Read raw bytes, not `BufRead::lines()`: a vocabulary token is a byte
    // string (spec.md §3), not necessarily valid UTF-8, and the write side
    // (`write_vectors`) is byte-general too.
    let mut line = Vec::new();
    let malformed = |line: &[u8]| Error::MalformedVocabLine(String::from_utf8_lossy(line).into_owned());
    let read_line = |reader: &mut BufReader<File>, buf: &mut Vec<u8>| -> std::io::Result<bool> {
        buf.clear();
        let n = reader.read_until(b'\n', buf)?;
        while buf.last() == Some(&b'\n') || buf.last() == Some(&b'\r') {
            buf.pop();
        }
        Ok(n > 0)
    };

    if !read_line(&mut reader, &mut line)? {
        return Err(Error::MalformedVocabLine("empty model file".into()));
    }
    let header = std::str::from_utf8(&line).map_err(|_| malformed(&line))?;
    let mut parts = header.split_whitespace();
    let v: usize = parts
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| malformed(&line))?;
    let d: usize = parts
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| malformed(&line))?;

    let mut words = Vec::with_capacity(v);
    let mut vectors = Vec::with_capacity(v * d);
    while read_line(&mut reader, &mut line)? {
        let split_at = line
            .iter()
            .position(|&b| b == b' ')
            .ok_or_else(|| malformed(&line))?;
        let word = String::from_utf8_lossy(&line[..split_at]).into_owned();
        let rest = std::str::from_utf8(&line[split_at + 1..]).map_err(|_| malformed(&line))?;
        let mut row = Vec::with_capacity(d);
        for f in rest.split_whitespace() {
            row.push(f.parse::<f32>().map_err(|_| malformed(&line))?);
        }
        if row.len() != d {
            return Err(Error::DimensionMismatch {
                expected: d,
                found: row.len(),
            });
        }
        words.push(word);
        vectors.extend(row);
    }
    Ok((words, vectors, d))
}

/// Read back a binary-mode vector file written by [`write_vectors`].
pub fn read_vectors_binary(path: &Path) -> Result<(Vec<String>, Vec<f32>, usize), Error> {
    let file = File::open(path).map_err(|_| Error::MissingVocabFile(path.display().to_string()))?;
    let mut r = BufReader::new(file);

    let mut header = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        r.read_exact(&mut byte)?;
        if byte[0] == b'\n' {
            break;
        }
        header.push(byte[0]);
    }
    let header = String::from_utf8_lossy(&header);
    let mut parts = header.split_whitespace();
    let v: usize = parts
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| Error::MalformedVocabLine(header.to_string()))?;
    let d: usize = parts
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| Error::MalformedVocabLine(header.to_string()))?;

    let mut words = Vec::with_capacity(v);
    let mut vectors = Vec::with_capacity(v * d);
    for _ in 0..v {
        let mut word = Vec::new();
        loop {
            r.read_exact(&mut byte)?;
            if byte[0] == b' ' {
                break;
            }
            word.push(byte[0]);
        }
        words.push(String::from_utf8_lossy(&word).to_string());
        let mut buf4 = [0u8; 4];
        for _ in 0..d {
            r.read_exact(&mut buf4)?;
            vectors.push(f32::from_le_bytes(buf4));
        }
        r.read_exact(&mut byte)?; // the row-terminating newline
    }
    Ok((words, vectors, d))
}

//! Sparse-triple text serialization.
//!
//! Line-oriented format shared by all tables: a `nrow,ncol` header
//! followed by one `row,col,value` line per strictly-positive cell in
//! row-major order. Float values use scientific notation that
//! round-trips to `f32`. The sorted topic map uses the same layout
//! with `word,topic,count` rows, word-ascending and descending by
//! count within a word.
//!
//! Readers treat an unparseable header as a corrupted model (fatal)
//! and skip malformed data rows with a warning, mirroring the split
//! between structural and recoverable damage.

use crate::common_io::{open_buf_reader, open_buf_writer};
use crate::f32_matrix::F32Matrix;
use crate::sorted_map::SortedTopicMap;
use crate::u32_matrix::U32Matrix;
use log::warn;
use std::io::{BufRead, Write};

/// Write the nonzero cells of a `u32` matrix as sparse triples.
pub fn write_u32_triplets(m: &U32Matrix, out_file: &str) -> anyhow::Result<()> {
    let mut buf = open_buf_writer(out_file)?;
    let (nrow, ncol) = m.shape();

    writeln!(buf, "{},{}", nrow, ncol)?;
    for r in 0..nrow {
        for c in 0..ncol {
            let val = m.get(r, c);
            if val > 0 {
                writeln!(buf, "{},{},{}", r, c, val)?;
            }
        }
    }
    buf.flush()?;
    Ok(())
}

/// Read a sparse-triple file back into a dense `u32` matrix.
pub fn read_u32_triplets(in_file: &str) -> anyhow::Result<U32Matrix> {
    let buf = open_buf_reader(in_file)?;
    let mut lines = buf.lines();

    let header = lines
        .next()
        .ok_or_else(|| anyhow::anyhow!("model corrupted, missing header: {}", in_file))??;
    let (nrow, ncol) = parse_header(&header)?;

    let mut m = U32Matrix::new(nrow, ncol);
    for (line_idx, line) in lines.enumerate() {
        let line = line?;
        let Some((r, c, val)) = parse_triple::<u32>(&line) else {
            warn!("data corrupted, row {}, data {}", line_idx + 1, line);
            continue;
        };
        if r >= nrow || c >= ncol {
            warn!("triple out of bounds, row {}, data {}", line_idx + 1, line);
            continue;
        }
        m.set(r, c, val);
    }
    Ok(m)
}

/// Write the strictly-positive cells of an `f32` matrix as sparse
/// triples in scientific notation.
pub fn write_f32_triplets(m: &F32Matrix, out_file: &str) -> anyhow::Result<()> {
    let mut buf = open_buf_writer(out_file)?;
    let (nrow, ncol) = m.shape();

    writeln!(buf, "{},{}", nrow, ncol)?;
    for r in 0..nrow {
        for c in 0..ncol {
            let val = m.get(r, c);
            if val > 0.0 {
                writeln!(buf, "{},{},{:e}", r, c, val)?;
            }
        }
    }
    buf.flush()?;
    Ok(())
}

/// Read a sparse-triple file back into a dense `f32` matrix.
pub fn read_f32_triplets(in_file: &str) -> anyhow::Result<F32Matrix> {
    let buf = open_buf_reader(in_file)?;
    let mut lines = buf.lines();

    let header = lines
        .next()
        .ok_or_else(|| anyhow::anyhow!("model corrupted, missing header: {}", in_file))??;
    let (nrow, ncol) = parse_header(&header)?;

    let mut m = F32Matrix::new(nrow, ncol);
    for (line_idx, line) in lines.enumerate() {
        let line = line?;
        let Some((r, c, val)) = parse_triple::<f32>(&line) else {
            warn!("data corrupted, row {}, data {}", line_idx + 1, line);
            continue;
        };
        if r >= nrow || c >= ncol {
            warn!("triple out of bounds, row {}, data {}", line_idx + 1, line);
            continue;
        }
        m.set(r, c, val);
    }
    Ok(m)
}

/// Dump a sorted topic map: `max_word_id+1,max_topic_id+1` header,
/// then `word,topic,count` rows, word-ascending with each word's
/// entries in their stored descending-count order.
///
/// An empty map produces an empty file.
pub fn write_topic_map(map: &SortedTopicMap, out_file: &str) -> anyhow::Result<()> {
    let mut buf = open_buf_writer(out_file)?;
    if map.is_empty() {
        buf.flush()?;
        return Ok(());
    }

    writeln!(buf, "{},{}", map.max_word_id() + 1, map.max_topic_id() + 1)?;
    for w in 0..=map.max_word_id() {
        for (topic_id, count) in map.iter_word(w) {
            writeln!(buf, "{},{},{}", w, topic_id, count)?;
        }
    }
    buf.flush()?;
    Ok(())
}

/// Load a sorted topic map dumped by [`write_topic_map`].
///
/// `topic_num` must be the topic count of the run that will use the
/// map; the packed-word width is derived from it, not from the header
/// (the header's column count only reflects topics that were actually
/// observed).
pub fn read_topic_map(in_file: &str, topic_num: u32) -> anyhow::Result<SortedTopicMap> {
    let buf = open_buf_reader(in_file)?;
    let mut lines = buf.lines();

    let mut map = SortedTopicMap::new(topic_num);
    let Some(header) = lines.next() else {
        // empty dump of an empty map
        return Ok(map);
    };
    let (_nword, ntopic) = parse_header(&header?)?;
    if ntopic > topic_num {
        anyhow::bail!(
            "model corrupted, {} topics in dump exceed configured {}",
            ntopic,
            topic_num
        );
    }

    for (line_idx, line) in lines.enumerate() {
        let line = line?;
        let Some((w, t, count)) = parse_triple::<u32>(&line) else {
            warn!("data corrupted, row {}, data {}", line_idx + 1, line);
            continue;
        };
        if t >= topic_num {
            warn!("topic out of range, row {}, data {}", line_idx + 1, line);
            continue;
        }
        map.incr(w, t, count);
    }
    Ok(map)
}

fn parse_header(line: &str) -> anyhow::Result<(u32, u32)> {
    let fields: Vec<&str> = line.split(',').collect();
    if fields.len() != 2 {
        anyhow::bail!("model corrupted, shape not found: {}", line);
    }
    let nrow = fields[0]
        .parse::<u32>()
        .map_err(|_| anyhow::anyhow!("model corrupted, bad row count: {}", line))?;
    let ncol = fields[1]
        .parse::<u32>()
        .map_err(|_| anyhow::anyhow!("model corrupted, bad column count: {}", line))?;
    Ok((nrow, ncol))
}

fn parse_triple<T: std::str::FromStr>(line: &str) -> Option<(u32, u32, T)> {
    let fields: Vec<&str> = line.split(',').collect();
    if fields.len() != 3 {
        return None;
    }
    let r = fields[0].parse::<u32>().ok()?;
    let c = fields[1].parse::<u32>().ok()?;
    let val = fields[2].parse::<T>().ok()?;
    Some((r, c, val))
}

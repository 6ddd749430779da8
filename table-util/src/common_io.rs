use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Open a file for reading and return a buffered reader
/// * `input_file` - file name, either gzipped or not
pub fn open_buf_reader(input_file: &str) -> anyhow::Result<Box<dyn BufRead>> {
    let ext = Path::new(input_file).extension().and_then(|x| x.to_str());
    let file = File::open(input_file)?;
    match ext {
        Some("gz") => Ok(Box::new(BufReader::new(GzDecoder::new(file)))),
        _ => Ok(Box::new(BufReader::new(file))),
    }
}

/// Open a file for writing and return a buffered writer, creating
/// parent directories as needed
/// * `output_file` - file name, either gzipped or not
pub fn open_buf_writer(output_file: &str) -> anyhow::Result<Box<dyn Write>> {
    if let Some(dir) = Path::new(output_file).parent() {
        std::fs::create_dir_all(dir)?;
    }
    let ext = Path::new(output_file).extension().and_then(|x| x.to_str());
    let file = File::create(output_file)?;
    match ext {
        Some("gz") => {
            let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
            Ok(Box::new(BufWriter::new(encoder)))
        }
        _ => Ok(Box::new(BufWriter::new(file))),
    }
}

/// Read every line of the input file into memory
/// * `input_file` - file name, either gzipped or not
pub fn read_lines(input_file: &str) -> anyhow::Result<Vec<String>> {
    let buf = open_buf_reader(input_file)?;
    let mut lines = vec![];
    for x in buf.lines() {
        lines.push(x?);
    }
    Ok(lines)
}

/// Write every line into the output file
/// * `lines` - vector of lines
/// * `output_file` - file name, either gzipped or not
pub fn write_lines(lines: &[String], output_file: &str) -> anyhow::Result<()> {
    let mut buf = open_buf_writer(output_file)?;
    for l in lines {
        writeln!(buf, "{}", l)?;
    }
    buf.flush()?;
    Ok(())
}

#[allow(dead_code)]
/// Create a temporary directory and suggest a file name inside it
/// * `suffix` - suffix of the file name
pub fn create_temp_dir_file(suffix: &str) -> anyhow::Result<std::path::PathBuf> {
    let temp_dir = tempfile::tempdir()?.path().to_path_buf();
    std::fs::create_dir_all(&temp_dir)?;
    let temp_file = tempfile::Builder::new()
        .suffix(suffix)
        .tempfile_in(temp_dir)?
        .path()
        .to_owned();

    Ok(temp_file)
}

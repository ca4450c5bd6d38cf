use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use flate2::read::MultiGzDecoder;

use crate::error::PipelineError;

/// Decodes the whole stream so truncated or half-written outputs are caught.
pub fn validate_gzip(path: &Path) -> Result<u64, PipelineError> {
    let corrupt = |message: String| PipelineError::CorruptOutput {
        path: path.display().to_string(),
        message,
    };
    let file = fs::File::open(path).map_err(|err| corrupt(err.to_string()))?;
    let mut decoder = MultiGzDecoder::new(io::BufReader::new(file));
    let mut buffer = [0u8; 64 * 1024];
    let mut total = 0u64;
    loop {
        let read = decoder
            .read(&mut buffer)
            .map_err(|err| corrupt(err.to_string()))?;
        if read == 0 {
            break;
        }
        total += read as u64;
    }
    Ok(total)
}

pub fn find_in_path(name: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    for path in std::env::split_paths(&path_var) {
        let exe = path.join(format!("{name}.exe"));
        if exe.is_file() {
            return Some(exe);
        }
        let plain = path.join(name);
        if plain.is_file() {
            return Some(plain);
        }
    }
    None
}

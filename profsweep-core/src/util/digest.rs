use std::fs::File;
use std::io::{Read, Result};
use std::path::Path;

/// BLAKE3 of a whole file, streamed in 64 KiB reads.
pub fn file_digest(path: &Path) -> Result<[u8; 32]> {
    let mut f = File::open(path)?;
    let mut hasher = blake3::Hasher::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = f.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(*hasher.finalize().as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_one_shot_hash() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("a.reg");
        let data = vec![7u8; 200 * 1024];
        std::fs::write(&p, &data).unwrap();
        assert_eq!(file_digest(&p).unwrap(), *blake3::hash(&data).as_bytes());
    }
}

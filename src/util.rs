use crate::error::ArtifactLoadError;
use std::{fs, path::{Path, PathBuf}};


/// Resolve a model location: a `.gguf` file, or a directory holding one (first in name order).
pub fn resolve_gguf<P: AsRef<Path>>(p: P) -> Result<PathBuf, ArtifactLoadError> {
let p = p.as_ref();
if p.is_file() { return Ok(p.to_path_buf()); }
if !p.is_dir() { return Err(ArtifactLoadError::Missing(p.to_path_buf())); }
let mut found: Vec<PathBuf> = fs::read_dir(p)
.map_err(|_| ArtifactLoadError::Missing(p.to_path_buf()))?
.filter_map(Result::ok)
.map(|e| e.path())
.filter(|f| f.is_file() && f.extension().and_then(|s| s.to_str()) == Some("gguf"))
.collect();
found.sort();
found.into_iter().next().ok_or_else(|| ArtifactLoadError::Missing(p.join("*.gguf")))
}


/// Resolve a tokenizer location: a `tokenizer.json` file, or a directory containing one.
pub fn resolve_tokenizer<P: AsRef<Path>>(p: P) -> Result<PathBuf, ArtifactLoadError> {
let p = p.as_ref();
let file = if p.is_dir() { p.join("tokenizer.json") } else { p.to_path_buf() };
if file.is_file() { Ok(file) } else { Err(ArtifactLoadError::Missing(file)) }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("note-keywords-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn gguf_dir_picks_first_by_name() {
        let dir = scratch("gguf");
        fs::write(dir.join("b.gguf"), b"").unwrap();
        fs::write(dir.join("a.gguf"), b"").unwrap();
        fs::write(dir.join("notes.txt"), b"").unwrap();
        assert_eq!(resolve_gguf(&dir).unwrap(), dir.join("a.gguf"));
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn gguf_dir_without_model_is_missing() {
        let dir = scratch("empty");
        assert!(matches!(resolve_gguf(&dir), Err(ArtifactLoadError::Missing(_))));
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_locations_are_reported() {
        let nowhere = Path::new("metadata/definitely-not-here");
        assert!(matches!(resolve_gguf(nowhere), Err(ArtifactLoadError::Missing(_))));
        match resolve_tokenizer(nowhere) {
            Err(ArtifactLoadError::Missing(p)) => assert_eq!(p, nowhere),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn tokenizer_dir_resolves_json() {
        let dir = scratch("tok");
        fs::write(dir.join("tokenizer.json"), b"{}").unwrap();
        assert_eq!(resolve_tokenizer(&dir).unwrap(), dir.join("tokenizer.json"));
        fs::remove_dir_all(&dir).unwrap();
    }
}

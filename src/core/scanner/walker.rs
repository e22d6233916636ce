//! Directory walking using walkdir, in shuffled order.

use super::filter::{is_hidden, ImageFilter};
use crate::error::ScanError;
use rand::seq::SliceRandom;
use rand::Rng;
use std::path::PathBuf;
use tracing::warn;
use walkdir::WalkDir;

/// Result of walking the corpus roots
#[derive(Debug, Default)]
pub struct WalkResult {
    /// Image paths, shuffled
    pub paths: Vec<PathBuf>,
    /// Non-fatal errors met along the way
    pub errors: Vec<ScanError>,
}

/// Lists corpus images under a set of roots
pub struct CorpusWalker {
    filter: ImageFilter,
    follow_symlinks: bool,
}

impl CorpusWalker {
    pub fn new(filter: ImageFilter, follow_symlinks: bool) -> Self {
        Self {
            filter,
            follow_symlinks,
        }
    }

    /// Walk every root and return the images in random order.
    ///
    /// Missing roots and unreadable entries are reported in
    /// [`WalkResult::errors`] rather than failing the walk.
    pub fn walk<R: Rng + ?Sized>(&self, roots: &[PathBuf], rng: &mut R) -> WalkResult {
        let mut result = WalkResult::default();

        for root in roots {
            if !root.is_dir() {
                warn!(root = %root.display(), "corpus root not found");
                result.errors.push(ScanError::RootNotFound { path: root.clone() });
                continue;
            }

            let include_hidden = self.filter.include_hidden();
            let entries = WalkDir::new(root)
                .follow_links(self.follow_symlinks)
                .into_iter()
                .filter_entry(|e| e.depth() == 0 || include_hidden || !is_hidden(e.path()));

            for entry in entries {
                match entry {
                    Ok(entry) => {
                        if entry.file_type().is_file() && self.filter.should_include(entry.path()) {
                            result.paths.push(entry.into_path());
                        }
                    }
                    Err(e) => {
                        let path = e.path().map(|p| p.to_path_buf()).unwrap_or_default();
                        let error = if e.io_error().map(|io| io.kind())
                            == Some(std::io::ErrorKind::PermissionDenied)
                        {
                            ScanError::PermissionDenied { path }
                        } else {
                            ScanError::ReadDirectory {
                                path,
                                source: std::io::Error::other(e.to_string()),
                            }
                        };
                        warn!(error = %error, "skipping unreadable corpus entry");
                        result.errors.push(error);
                    }
                }
            }
        }

        result.paths.shuffle(rng);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::fs;
    use tempfile::TempDir;

    fn touch(dir: &std::path::Path, name: &str) {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, [0xFF, 0xD8, 0xFF, 0xE0]).unwrap();
    }

    fn walker() -> CorpusWalker {
        CorpusWalker::new(ImageFilter::new(), false)
    }

    #[test]
    fn walk_empty_root_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let result = walker().walk(&[temp_dir.path().to_path_buf()], &mut StdRng::seed_from_u64(1));

        assert!(result.paths.is_empty());
        assert!(result.errors.is_empty());
    }

    #[test]
    fn walk_finds_nested_images_across_roots() {
        let download = TempDir::new().unwrap();
        let pass = TempDir::new().unwrap();
        touch(download.path(), "reddit/cats/a.jpg");
        touch(download.path(), "b.png");
        touch(pass.path(), "deep/er/c.jpeg");
        touch(pass.path(), "notes.txt");

        let result = walker().walk(
            &[download.path().to_path_buf(), pass.path().to_path_buf()],
            &mut StdRng::seed_from_u64(1),
        );

        assert_eq!(result.paths.len(), 3);
        assert!(result.paths.iter().all(|p| p.extension().unwrap() != "txt"));
    }

    #[test]
    fn walk_skips_hidden_directories() {
        let temp_dir = TempDir::new().unwrap();
        touch(temp_dir.path(), "visible.jpg");
        touch(temp_dir.path(), ".cache/inner.jpg");

        let result = walker().walk(&[temp_dir.path().to_path_buf()], &mut StdRng::seed_from_u64(1));

        assert_eq!(result.paths.len(), 1);
        assert!(result.paths[0].ends_with("visible.jpg"));
    }

    #[test]
    fn walk_order_depends_on_seed_only() {
        let temp_dir = TempDir::new().unwrap();
        for i in 0..20 {
            touch(temp_dir.path(), &format!("img_{i:02}.jpg"));
        }
        let roots = [temp_dir.path().to_path_buf()];

        let first = walker().walk(&roots, &mut StdRng::seed_from_u64(42)).paths;
        let second = walker().walk(&roots, &mut StdRng::seed_from_u64(42)).paths;

        assert_eq!(first, second);
        let mut sorted = first.clone();
        sorted.sort();
        assert_eq!(sorted.len(), 20);
    }

    #[test]
    fn missing_root_is_reported_not_fatal() {
        let temp_dir = TempDir::new().unwrap();
        touch(temp_dir.path(), "a.jpg");

        let result = walker().walk(
            &[PathBuf::from("/nonexistent/root/12345"), temp_dir.path().to_path_buf()],
            &mut StdRng::seed_from_u64(1),
        );

        assert_eq!(result.paths.len(), 1);
        assert!(matches!(result.errors[0], ScanError::RootNotFound { .. }));
    }
}

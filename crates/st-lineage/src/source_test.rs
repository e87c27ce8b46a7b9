use super::*;
use std::cell::Cell;

struct CountingProvider {
    reads: Cell<usize>,
    inner: InMemorySourceProvider,
}

impl SourceTextProvider for CountingProvider {
    fn read(&self, file_path: &str) -> io::Result<String> {
        self.reads.set(self.reads.get() + 1);
        self.inner.read(file_path)
    }
}

#[test]
fn test_in_memory_read_and_missing() {
    let provider = InMemorySourceProvider::new().with_file("a.sql", "SELECT 1");
    assert_eq!(provider.read("a.sql").unwrap(), "SELECT 1");
    let err = provider.read("b.sql").unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::NotFound);
}

#[test]
fn test_fs_provider_with_root() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("models")).unwrap();
    std::fs::write(dir.path().join("models/a.sql"), "SELECT 2").unwrap();

    let provider = FsSourceProvider::with_root(dir.path());
    assert_eq!(provider.read("models/a.sql").unwrap(), "SELECT 2");

    let absolute = dir.path().join("models/a.sql");
    let unrooted = FsSourceProvider::new();
    assert_eq!(unrooted.read(absolute.to_str().unwrap()).unwrap(), "SELECT 2");
    assert!(unrooted.read("definitely/not/here.sql").is_err());
}

#[test]
fn test_fs_provider_from_config() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("x.sql"), "SELECT 3").unwrap();
    let mut config = LineageConfig::default();
    config.builder.source_root = Some(dir.path().to_path_buf());

    let provider = FsSourceProvider::from_config(&config);
    assert_eq!(provider.read("x.sql").unwrap(), "SELECT 3");
}

#[test]
fn test_caching_provider_reads_once() {
    let counting = CountingProvider {
        reads: Cell::new(0),
        inner: InMemorySourceProvider::new().with_file("a.sql", "SELECT 1"),
    };
    let caching = CachingSourceProvider::new(counting);

    for _ in 0..3 {
        assert_eq!(caching.read("a.sql").unwrap(), "SELECT 1");
    }
    assert_eq!(caching.inner.reads.get(), 1);
    assert_eq!(caching.cached_len(), 1);

    caching.invalidate("a.sql");
    caching.read("a.sql").unwrap();
    assert_eq!(caching.inner.reads.get(), 2);
}

#[test]
fn test_caching_provider_does_not_cache_failures() {
    let caching = CachingSourceProvider::new(InMemorySourceProvider::new());
    assert!(caching.read("missing.sql").is_err());
    assert_eq!(caching.cached_len(), 0);
    caching.clear();
}

#[test]
fn test_boxed_provider() {
    let boxed: Box<dyn SourceTextProvider> =
        Box::new(InMemorySourceProvider::new().with_file("a.sql", "x"));
    assert_eq!(boxed.read("a.sql").unwrap(), "x");
}

use std::path::Path;

/// Half-open byte interval `[start, end)` assigned to one worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    pub index: usize,
    pub start: u64,
    pub end: u64,
}

impl Chunk {
    pub fn size(&self) -> u64 {
        self.end - self.start
    }
}

/// Splits `[0, total_size)` into at most `workers` contiguous chunks of
/// `ceil(total_size / workers)` bytes; the last one may be shorter.
pub fn split_chunks(total_size: u64, workers: usize) -> Vec<Chunk> {
    let workers = workers.max(1) as u64;
    let part_size = total_size.div_ceil(workers).max(1);

    let mut chunks = Vec::new();
    for i in 0..workers {
        let start = i * part_size;
        if start >= total_size {
            break;
        }
        let end = (start + part_size).min(total_size);
        chunks.push(Chunk {
            index: i as usize,
            start,
            end,
        });
    }
    chunks
}

/// Human-readable size with 1024-based units and one decimal above bytes.
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    let value = bytes as f64;
    if bytes >= GB {
        format!("{:.1} GB", value / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", value / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", value / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Basename of `path`, cut to `max_chars` characters.
pub fn display_name(path: &Path, max_chars: usize) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| path.to_string_lossy().into_owned());

    let truncated: String = name.chars().take(max_chars).collect();
    if truncated.is_empty() {
        "(unnamed)".to_string()
    } else {
        truncated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_covers(chunks: &[Chunk], total: u64) {
        let mut expected_start = 0;
        for chunk in chunks {
            assert_eq!(chunk.start, expected_start);
            assert!(chunk.end > chunk.start);
            expected_start = chunk.end;
        }
        assert_eq!(expected_start, total);
        assert_eq!(chunks.iter().map(Chunk::size).sum::<u64>(), total);
    }

    #[test]
    fn split_is_contiguous_and_complete() {
        for (total, workers) in [(1000, 4), (1001, 4), (7, 3), (1, 8), (65, 65), (10_000_019, 8)] {
            let chunks = split_chunks(total, workers);
            assert!(chunks.len() <= workers);
            assert_covers(&chunks, total);
        }
    }

    #[test]
    fn split_equal_chunks() {
        let chunks = split_chunks(1000, 4);
        assert_eq!(chunks.len(), 4);
        assert!(chunks.iter().all(|c| c.size() == 250));
    }

    #[test]
    fn split_small_file_uses_fewer_workers() {
        let chunks = split_chunks(3, 8);
        assert_eq!(chunks.len(), 3);
        assert_covers(&chunks, 3);

        // ceil(10 / 4) = 3 -> 3, 3, 3, 1
        let chunks = split_chunks(10, 4);
        assert_eq!(chunks.iter().map(Chunk::size).collect::<Vec<_>>(), vec![3, 3, 3, 1]);
    }

    #[test]
    fn split_empty_or_zero_workers() {
        assert!(split_chunks(0, 4).is_empty());
        let chunks = split_chunks(100, 0);
        assert_eq!(chunks.len(), 1);
        assert_covers(&chunks, 100);
    }

    #[test]
    fn size_formatting() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(1023), "1023 B");
        assert_eq!(format_size(1024), "1.0 KB");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(1_048_576), "1.0 MB");
        assert_eq!(format_size(3 * 1024 * 1024 * 1024), "3.0 GB");
    }

    #[test]
    fn display_name_uses_basename() {
        assert_eq!(display_name(Path::new("/tmp/dir/file.bin"), 20), "file.bin");
        assert_eq!(
            display_name(Path::new("a_really_long_file_name_here.iso"), 20),
            "a_really_long_file_n"
        );
        assert_eq!(display_name(Path::new(""), 20), "(unnamed)");
    }
}

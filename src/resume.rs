//! Resume-point discovery for partial updates.
//!
//! Part files produced under partial update carry the ordering key of their
//! first record as a filename suffix. The highest suffix on disk marks where
//! the previous run left off: that boundary file is regenerated (and may
//! grow with newly-arrived records), while every file below it is left
//! byte-for-byte untouched.

use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::debug;

/// Inspect existing output for `base_name` and return the resume key, the
/// highest numeric suffix found. `None` means no resumable state exists and
/// the run proceeds as a full generation.
pub fn find_resume_point(dir: &Path, base_name: &str) -> Result<Option<u64>, std::io::Error> {
    let mut resume_key = None;

    for name in part_file_names(dir, base_name)? {
        if let (suffix @ Some(_), _) = parse_part_name(&name, base_name) {
            resume_key = resume_key.max(suffix);
        }
    }

    if let Some(key) = resume_key {
        debug!(base_name, key, "Found resume point");
    }
    Ok(resume_key)
}

/// Existing part files for `base_name` that a resumed run must leave
/// untouched: the unsuffixed first part and every part with a suffix
/// strictly below the resume key.
pub fn untouched_parts(
    dir: &Path,
    base_name: &str,
    resume_key: u64,
) -> Result<Vec<PathBuf>, std::io::Error> {
    let mut parts = Vec::new();
    for name in part_file_names(dir, base_name)? {
        match parse_part_name(&name, base_name) {
            (Some(suffix), true) if suffix < resume_key => parts.push(dir.join(name)),
            (None, true) => parts.push(dir.join(name)),
            _ => {}
        }
    }
    parts.sort();
    Ok(parts)
}

fn part_file_names(dir: &Path, base_name: &str) -> Result<Vec<String>, std::io::Error> {
    let mut names = Vec::new();
    for dir_entry in std::fs::read_dir(dir)? {
        let dir_entry = dir_entry?;
        if let Some(name) = dir_entry.file_name().to_str() {
            if is_part_name(name, base_name) {
                names.push(name.to_string());
            }
        }
    }
    Ok(names)
}

fn part_pattern(base_name: &str) -> Regex {
    Regex::new(&format!(
        r"^{}(?:_(\d+))?\.xml(?:\.gz)?$",
        regex::escape(base_name)
    ))
    .expect("Invalid part-name pattern")
}

fn is_part_name(name: &str, base_name: &str) -> bool {
    part_pattern(base_name).is_match(name)
}

/// Returns (numeric suffix if any, whether the name matched the part
/// pattern at all).
fn parse_part_name(name: &str, base_name: &str) -> (Option<u64>, bool) {
    match part_pattern(base_name).captures(name) {
        Some(caps) => {
            let suffix = caps.get(1).and_then(|m| m.as_str().parse().ok());
            (suffix, true)
        }
        None => (None, false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(dir: &TempDir, name: &str) {
        std::fs::write(dir.path().join(name), "x").unwrap();
    }

    #[test]
    fn test_no_prior_files_means_full_run() {
        let dir = TempDir::new().unwrap();
        assert_eq!(find_resume_point(dir.path(), "sitemap_pages").unwrap(), None);
    }

    #[test]
    fn test_unsuffixed_file_alone_means_full_run() {
        let dir = TempDir::new().unwrap();
        touch(&dir, "sitemap_pages.xml");
        assert_eq!(find_resume_point(dir.path(), "sitemap_pages").unwrap(), None);
    }

    #[test]
    fn test_highest_suffix_wins() {
        let dir = TempDir::new().unwrap();
        touch(&dir, "sitemap_pages.xml");
        touch(&dir, "sitemap_pages_120.xml");
        touch(&dir, "sitemap_pages_45.xml");
        assert_eq!(
            find_resume_point(dir.path(), "sitemap_pages").unwrap(),
            Some(120)
        );
    }

    #[test]
    fn test_gz_suffixes_parse_too() {
        let dir = TempDir::new().unwrap();
        touch(&dir, "sitemap_pages_7.xml.gz");
        assert_eq!(
            find_resume_point(dir.path(), "sitemap_pages").unwrap(),
            Some(7)
        );
    }

    #[test]
    fn test_other_sources_are_ignored() {
        let dir = TempDir::new().unwrap();
        touch(&dir, "sitemap_posts_99.xml");
        touch(&dir, "sitemap_index.xml");
        touch(&dir, "sitemap_pages_3.xml");
        assert_eq!(
            find_resume_point(dir.path(), "sitemap_pages").unwrap(),
            Some(3)
        );
    }

    #[test]
    fn test_untouched_parts_exclude_boundary_and_beyond() {
        let dir = TempDir::new().unwrap();
        touch(&dir, "sitemap_pages.xml");
        touch(&dir, "sitemap_pages_45.xml");
        touch(&dir, "sitemap_pages_120.xml");

        let parts = untouched_parts(dir.path(), "sitemap_pages", 120).unwrap();
        let names: Vec<_> = parts
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["sitemap_pages.xml", "sitemap_pages_45.xml"]);
    }
}

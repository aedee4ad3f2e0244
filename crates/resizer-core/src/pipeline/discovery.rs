//! File discovery: finds images in the source folder and plans resize tasks.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::ProcessingConfig;
use crate::types::{ResizeParams, Task};

/// Discovers image files in directories.
pub struct FileDiscovery {
    config: ProcessingConfig,
}

/// Information about a discovered file.
#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    /// Full path to the file
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
}

/// Tasks built from a discovery pass, plus the files left out.
#[derive(Debug, Default)]
pub struct TaskPlan {
    pub tasks: Vec<Task>,
    /// Sources whose destination already exists
    pub skipped: Vec<PathBuf>,
}

impl FileDiscovery {
    /// Create a new file discovery instance.
    pub fn new(config: ProcessingConfig) -> Self {
        Self { config }
    }

    /// Discover all supported image files at a path.
    ///
    /// If path is a file, returns it if supported. If path is a directory,
    /// lists its supported files, descending into subfolders only when
    /// `recursive` is set.
    pub fn discover(&self, path: &Path) -> std::io::Result<Vec<DiscoveredFile>> {
        if path.is_file() {
            if self.is_supported(path) {
                let meta = std::fs::metadata(path)?;
                return Ok(vec![DiscoveredFile {
                    path: path.to_path_buf(),
                    size: meta.len(),
                }]);
            }
            return Ok(vec![]);
        }

        if !path.is_dir() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("source folder not found: {}", path.display()),
            ));
        }

        let max_depth = if self.config.recursive { usize::MAX } else { 1 };
        let mut files = Vec::new();

        for entry in WalkDir::new(path)
            .max_depth(max_depth)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let entry_path = entry.path();
            if entry_path.is_file() && self.is_supported(entry_path) {
                if let Ok(meta) = entry.metadata() {
                    files.push(DiscoveredFile {
                        path: entry_path.to_path_buf(),
                        size: meta.len(),
                    });
                }
            }
        }

        // Sort by path for deterministic ordering
        files.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(files)
    }

    /// Map discovered files to tasks writing under `destination_root`.
    ///
    /// Each destination mirrors the file's path relative to `source_root`.
    pub fn plan(
        &self,
        files: &[DiscoveredFile],
        source_root: &Path,
        destination_root: &Path,
        params: ResizeParams,
    ) -> TaskPlan {
        let mut plan = TaskPlan::default();

        for file in files {
            let relative = file
                .path
                .strip_prefix(source_root)
                .ok()
                .filter(|r| !r.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(file.path.file_name().unwrap_or_default()));
            let destination = destination_root.join(relative);

            if self.config.skip_existing && destination.exists() {
                plan.skipped.push(file.path.clone());
                continue;
            }
            plan.tasks.push(Task::new(file.path.clone(), destination, params));
        }

        plan
    }

    /// Check if a file has a supported extension.
    fn is_supported(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                self.config
                    .supported_formats
                    .iter()
                    .any(|fmt| fmt.eq_ignore_ascii_case(ext))
            })
            .unwrap_or(false)
    }

    /// Get total size of all discovered files.
    pub fn total_size(files: &[DiscoveredFile]) -> u64 {
        files.iter().map(|f| f.size).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, b"x").unwrap();
    }

    #[test]
    fn test_is_supported() {
        let discovery = FileDiscovery::new(ProcessingConfig::default());

        assert!(discovery.is_supported(Path::new("test.jpg")));
        assert!(discovery.is_supported(Path::new("test.JPG")));
        assert!(discovery.is_supported(Path::new("test.jpeg")));
        assert!(discovery.is_supported(Path::new("test.png")));
        assert!(!discovery.is_supported(Path::new("test.txt")));
        assert!(!discovery.is_supported(Path::new("test")));
    }

    #[test]
    fn test_discover_flat_by_default() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("b.png"));
        touch(&dir.path().join("a.JPG"));
        touch(&dir.path().join("notes.txt"));
        touch(&dir.path().join("nested/c.png"));

        let discovery = FileDiscovery::new(ProcessingConfig::default());
        let files = discovery.discover(dir.path()).unwrap();

        let names: Vec<_> = files
            .iter()
            .map(|f| f.path.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["a.JPG", "b.png"]);
    }

    #[test]
    fn test_discover_recursive() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("a.png"));
        touch(&dir.path().join("nested/deeper/c.png"));

        let config = ProcessingConfig {
            recursive: true,
            ..ProcessingConfig::default()
        };
        let files = FileDiscovery::new(config).discover(dir.path()).unwrap();
        assert_eq!(files.len(), 2);
    }

    #[test]
    fn test_discover_missing_folder() {
        let discovery = FileDiscovery::new(ProcessingConfig::default());
        let err = discovery
            .discover(Path::new("/nonexistent/source"))
            .unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    }

    #[test]
    fn test_plan_mirrors_relative_paths() {
        let files = vec![
            DiscoveredFile {
                path: PathBuf::from("/src/a.png"),
                size: 1,
            },
            DiscoveredFile {
                path: PathBuf::from("/src/trip/b.jpg"),
                size: 1,
            },
        ];
        let discovery = FileDiscovery::new(ProcessingConfig::default());
        let plan = discovery.plan(
            &files,
            Path::new("/src"),
            Path::new("/dst"),
            ResizeParams::default(),
        );

        assert!(plan.skipped.is_empty());
        assert_eq!(plan.tasks[0].destination(), Path::new("/dst/a.png"));
        assert_eq!(plan.tasks[1].destination(), Path::new("/dst/trip/b.jpg"));
    }

    #[test]
    fn test_plan_skips_existing_destinations() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        let dst = dir.path().join("dst");
        touch(&src.join("done.png"));
        touch(&src.join("todo.png"));
        touch(&dst.join("done.png"));

        let config = ProcessingConfig {
            skip_existing: true,
            ..ProcessingConfig::default()
        };
        let discovery = FileDiscovery::new(config);
        let files = discovery.discover(&src).unwrap();
        let plan = discovery.plan(&files, &src, &dst, ResizeParams::default());

        assert_eq!(plan.tasks.len(), 1);
        assert_eq!(plan.tasks[0].file_name(), "todo.png");
        assert_eq!(plan.skipped, vec![src.join("done.png")]);
    }

    #[test]
    fn test_total_size() {
        let files = vec![
            DiscoveredFile {
                path: PathBuf::from("a.jpg"),
                size: 100,
            },
            DiscoveredFile {
                path: PathBuf::from("b.jpg"),
                size: 200,
            },
        ];

        assert_eq!(FileDiscovery::total_size(&files), 300);
    }
}

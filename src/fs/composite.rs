//! [`CompositeFS`]: overlays several backends at distinct single-segment
//! guest paths, per spec §4.4 and component I ("overlay/composite
//! resolver").

use std::path::PathBuf;

use crate::file::{CompositeRootFile, File};
use crate::oflag::Oflag;
use crate::readdir::Readdir;
use crate::stat::StatT;
use crate::timespec::TimeSpec;
use crate::Errno;

use super::FS;

/// One overlay mount. `guest_path` is `"/"` for the root filesystem or
/// `"/name"` for a single-segment sub-mount.
struct Mount {
    guest_path: String,
    backend: FS,
}

pub struct CompositeFS {
    mounts: Vec<Mount>,
}

impl CompositeFS {
    /// Builds a composite over `mounts`, an ordered list of
    /// `(guest_path, backend)` pairs. Rejects duplicate guest paths,
    /// more than one `"/"` mount, and any multi-segment guest path.
    pub fn new(mounts: Vec<(String, FS)>) -> Result<CompositeFS, Errno> {
        let mut seen_root = false;
        let mut seen_names = std::collections::HashSet::new();
        let mut out = Vec::with_capacity(mounts.len());
        for (guest_path, backend) in mounts {
            let normalized = normalize_mount_path(&guest_path)?;
            if normalized == "/" {
                if seen_root {
                    return Err(Errno::EINVAL);
                }
                seen_root = true;
            } else if !seen_names.insert(normalized.clone()) {
                return Err(Errno::EINVAL);
            }
            out.push(Mount {
                guest_path: normalized,
                backend,
            });
        }
        Ok(CompositeFS { mounts: out })
    }

    pub(crate) fn string(&self) -> String {
        let parts: Vec<String> = self
            .mounts
            .iter()
            .map(|m| format!("{}:{}", mount_label(&m.guest_path), m.backend.string()))
            .collect();
        format!("[{}]", parts.join(" "))
    }

    /// Resolves `path` to its mount and the remainder to hand to the
    /// backend, per spec §4.4 resolution steps 1-3: longest single-segment
    /// prefix match, ties won by later registration.
    fn resolve(&self, path: &str) -> Result<(usize, String), Errno> {
        if self.mounts.is_empty() {
            return Err(Errno::ENOENT);
        }
        let cleaned = path.trim_start_matches('/').trim_end_matches('/');
        let first_segment = cleaned.split('/').next().unwrap_or("");

        let mut best: Option<usize> = None;
        for (idx, mount) in self.mounts.iter().enumerate() {
            let matches = if mount.guest_path == "/" {
                true
            } else {
                mount.guest_path.trim_start_matches('/') == first_segment
            };
            if matches {
                let is_longer_or_equal = match best {
                    None => true,
                    Some(prev) => mount.guest_path.len() >= self.mounts[prev].guest_path.len(),
                };
                if is_longer_or_equal {
                    best = Some(idx);
                }
            }
        }
        let idx = best.ok_or(Errno::ENOENT)?;
        let remainder = if self.mounts[idx].guest_path == "/" {
            cleaned.to_string()
        } else {
            cleaned
                .splitn(2, '/')
                .nth(1)
                .unwrap_or("")
                .to_string()
        };
        Ok((idx, remainder))
    }

    fn is_root_mount(&self, idx: usize) -> bool {
        self.mounts[idx].guest_path == "/"
    }

    fn sibling_mount_names(&self, idx: usize) -> Vec<String> {
        self.mounts
            .iter()
            .enumerate()
            .filter(|(i, m)| *i != idx && m.guest_path != "/")
            .map(|(_, m)| m.guest_path.trim_start_matches('/').to_string())
            .collect()
    }

    pub(crate) fn open_file(&self, path: &str, flag: Oflag, mode: u32) -> Result<File, Errno> {
        let (idx, remainder) = self.resolve(path)?;
        let opened = self.mounts[idx].backend.open_file(&remainder, flag, mode)?;
        if self.is_root_mount(idx) && remainder.is_empty() && opened.is_dir() {
            let siblings = self.sibling_mount_names(idx);
            if !siblings.is_empty() {
                return Ok(File::CompositeRoot(Box::new(CompositeRootFile::new(
                    opened, siblings,
                ))));
            }
        }
        Ok(opened)
    }

    pub(crate) fn mkdir(&self, path: &str, mode: u32) -> Result<(), Errno> {
        let (idx, remainder) = self.resolve(path)?;
        self.mounts[idx].backend.mkdir(&remainder, mode)
    }

    pub(crate) fn chmod(&self, path: &str, mode: u32) -> Result<(), Errno> {
        let (idx, remainder) = self.resolve(path)?;
        self.mounts[idx].backend.chmod(&remainder, mode)
    }

    pub(crate) fn chown(&self, path: &str, uid: i64, gid: i64) -> Result<(), Errno> {
        let (idx, remainder) = self.resolve(path)?;
        self.mounts[idx].backend.chown(&remainder, uid, gid)
    }

    pub(crate) fn lchown(&self, path: &str, uid: i64, gid: i64) -> Result<(), Errno> {
        let (idx, remainder) = self.resolve(path)?;
        self.mounts[idx].backend.lchown(&remainder, uid, gid)
    }

    pub(crate) fn rename(&self, old: &str, new: &str) -> Result<(), Errno> {
        let (old_idx, old_remainder) = self.resolve(old)?;
        let (new_idx, new_remainder) = self.resolve(new)?;
        if old_idx != new_idx {
            // Spec §2 Non-goals: no atomic cross-device rename; a rename
            // across mounts isn't representable as one host-level call.
            return Err(Errno::ENOSYS);
        }
        self.mounts[old_idx].backend.rename(&old_remainder, &new_remainder)
    }

    pub(crate) fn rmdir(&self, path: &str) -> Result<(), Errno> {
        let (idx, remainder) = self.resolve(path)?;
        self.mounts[idx].backend.rmdir(&remainder)
    }

    pub(crate) fn unlink(&self, path: &str) -> Result<(), Errno> {
        let (idx, remainder) = self.resolve(path)?;
        self.mounts[idx].backend.unlink(&remainder)
    }

    pub(crate) fn link(&self, old: &str, new: &str) -> Result<(), Errno> {
        let (old_idx, old_remainder) = self.resolve(old)?;
        let (new_idx, new_remainder) = self.resolve(new)?;
        if old_idx != new_idx {
            return Err(Errno::ENOSYS);
        }
        self.mounts[old_idx].backend.link(&old_remainder, &new_remainder)
    }

    pub(crate) fn symlink(&self, target: &str, path: &str) -> Result<(), Errno> {
        let (idx, remainder) = self.resolve(path)?;
        self.mounts[idx].backend.symlink(target, &remainder)
    }

    pub(crate) fn readlink(&self, path: &str) -> Result<PathBuf, Errno> {
        let (idx, remainder) = self.resolve(path)?;
        self.mounts[idx].backend.readlink(&remainder)
    }

    pub(crate) fn utimens(&self, path: &str, atim: TimeSpec, mtim: TimeSpec) -> Result<(), Errno> {
        let (idx, remainder) = self.resolve(path)?;
        self.mounts[idx].backend.utimens(&remainder, atim, mtim)
    }

    pub(crate) fn truncate(&self, path: &str, size: i64) -> Result<(), Errno> {
        let (idx, remainder) = self.resolve(path)?;
        self.mounts[idx].backend.truncate(&remainder, size)
    }

    pub(crate) fn stat(&self, path: &str) -> Result<StatT, Errno> {
        let (idx, remainder) = self.resolve(path)?;
        self.mounts[idx].backend.stat(&remainder)
    }

    pub(crate) fn lstat(&self, path: &str) -> Result<StatT, Errno> {
        let (idx, remainder) = self.resolve(path)?;
        self.mounts[idx].backend.lstat(&remainder)
    }

    pub(crate) fn readdir(&self, path: &str) -> Result<Readdir, Errno> {
        let mut file = self.open_file(path, Oflag::RDONLY | Oflag::DIRECTORY, 0)?;
        file.readdir()
    }
}

fn mount_label(guest_path: &str) -> &str {
    if guest_path == "/" {
        "/"
    } else {
        guest_path
    }
}

/// Normalizes a mount's registered guest path and rejects anything but
/// `"/"` or a single segment `"/name"`, per spec §4.4's `CompositeFS`
/// precondition.
fn normalize_mount_path(path: &str) -> Result<String, Errno> {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() || trimmed == "/" {
        return Ok("/".to_string());
    }
    let rel = trimmed.trim_start_matches('/');
    if rel.is_empty() || rel.contains('/') {
        return Err(Errno::EINVAL);
    }
    Ok(format!("/{rel}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::DirFS;

    fn dirfs_at(path: &std::path::Path) -> FS {
        FS::Dir(DirFS::new(path).unwrap())
    }

    #[test]
    fn rejects_duplicate_root_mount() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        let result = CompositeFS::new(vec![
            ("/".to_string(), dirfs_at(a.path())),
            ("/".to_string(), dirfs_at(b.path())),
        ]);
        assert_eq!(result.err(), Some(Errno::EINVAL));
    }

    #[test]
    fn rejects_multi_segment_guest_path() {
        let a = tempfile::tempdir().unwrap();
        let result = CompositeFS::new(vec![("/a/b".to_string(), dirfs_at(a.path()))]);
        assert_eq!(result.err(), Some(Errno::EINVAL));
    }

    #[test]
    fn resolves_longest_prefix() {
        let root = tempfile::tempdir().unwrap();
        let sub = tempfile::tempdir().unwrap();
        let composite = CompositeFS::new(vec![
            ("/".to_string(), dirfs_at(root.path())),
            ("/tmp".to_string(), dirfs_at(sub.path())),
        ])
        .unwrap();
        let (idx, remainder) = composite.resolve("/tmp/foo").unwrap();
        assert_eq!(remainder, "foo");
        assert!(!composite.is_root_mount(idx));

        let (idx, remainder) = composite.resolve("/other").unwrap();
        assert_eq!(remainder, "other");
        assert!(composite.is_root_mount(idx));
    }

    #[test]
    fn string_lists_mounts_in_order() {
        let root = tempfile::tempdir().unwrap();
        let sub = tempfile::tempdir().unwrap();
        let root_path = root.path().display().to_string();
        let sub_path = sub.path().display().to_string();
        let composite = CompositeFS::new(vec![
            ("/".to_string(), dirfs_at(root.path())),
            ("/tmp".to_string(), dirfs_at(sub.path())),
        ])
        .unwrap();
        assert_eq!(
            composite.string(),
            format!("[/:dir:{root_path} /tmp:dir:{sub_path}]")
        );
    }
}

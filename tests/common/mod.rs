//! Shared fixtures: fake encoder binaries and configs pinned to a private
//! temp directory so cleanup invariants can be asserted by listing it.
#![allow(dead_code)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use social_picker::Config;

/// Write an executable shell script and return its path.
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, body).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Fake encoder that succeeds and creates its output file (last argument).
pub fn fake_encoder_ok(dir: &Path) -> PathBuf {
    write_script(
        dir,
        "ffmpeg-ok.sh",
        "#!/bin/sh\neval \"out=\\${$#}\"\nprintf 'merged' > \"$out\"\nexit 0\n",
    )
}

/// Fake encoder that fails with a diagnostic on stderr.
pub fn fake_encoder_fail(dir: &Path) -> PathBuf {
    write_script(
        dir,
        "ffmpeg-fail.sh",
        "#!/bin/sh\necho 'encoder exploded' >&2\nexit 1\n",
    )
}

/// Fake encoder that exits 0 but still writes to stderr — the "any stderr
/// is fatal" convention must treat this as a failure.
pub fn fake_encoder_noisy(dir: &Path) -> PathBuf {
    write_script(
        dir,
        "ffmpeg-noisy.sh",
        "#!/bin/sh\neval \"out=\\${$#}\"\nprintf 'merged' > \"$out\"\necho 'something odd' >&2\nexit 0\n",
    )
}

/// Config whose temp dir and encoder are confined to `dir`.
pub fn config_with(dir: &Path, encoder: &Path) -> Config {
    Config {
        temp_dir: Some(dir.to_path_buf()),
        ffmpeg_bin: encoder.display().to_string(),
        ..Config::default()
    }
}

/// Names of `picker_*` temp artifacts currently in `dir` (scripts and
/// fixture files are excluded by the prefix).
pub fn picker_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().to_string())
        .filter(|name| name.starts_with("picker_"))
        .collect();
    names.sort();
    names
}

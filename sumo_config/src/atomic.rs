use std::ffi::OsString;
use std::{fs, io::Write, path::Path};

/// Replace `path` with `bytes` so readers see either the old table or the new
/// one, never a torn file.
///
/// Writes `<name>.new` next to the target, syncs it and renames it over the
/// target. Missing parent directories are created.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".new");
    let tmp = path.with_file_name(name);

    let result = fs::File::create(&tmp).and_then(|mut f| {
        f.write_all(bytes)?;
        f.sync_all()
    });
    if let Err(e) = result {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    fs::rename(tmp, path)
}
